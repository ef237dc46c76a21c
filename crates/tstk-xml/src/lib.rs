//! tstk XML - Markup document engine
//!
//! In-memory markup trees used for toolkit configuration files and table
//! descriptions. Nodes live in an arena and are addressed by
//! generation-checked handles; siblings are threaded through an intrusive
//! ring so that detaching and re-attaching a node is O(1).
//!
//! Documents are assembled by a validating recursive descent over a
//! [`NodeSource`], normally the built-in [`Tokenizer`].

mod document;
mod generation;
mod node;
mod report;
pub mod ring;
mod tokenizer;
mod tree;

pub use document::{Document, Outline, ParseOptions};
pub use generation::Generation;
pub use node::{ClosingKind, Node, NodeKind};
pub use report::{ErrorList, LogReport, NullReport, Report};
pub use tokenizer::{NodeSource, Tokenizer};
pub use tree::{Children, Tree, TreeError, TreeResult};

/// Node identifier (slot index plus the generation of that slot)
///
/// A handle outlives the node it designates only as a dead value: once the
/// slot is freed its generation moves on and the handle no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: Generation,
}

impl NodeId {
    /// Slot index inside the owning tree
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    #[inline]
    pub fn generation(self) -> Generation {
        self.generation
    }
}

/// Document parse error, delivered to a [`Report`] sink
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("misplaced declaration, not directly inside a document")]
    DeclarationNotAtRoot,

    #[error("misplaced declaration, must be at the beginning of the document")]
    DeclarationAfterContent,

    #[error("mismatched end tag </{found}>, expected </{expected}>")]
    MismatchedEndTag { expected: String, found: String },

    #[error("unexpected end tag </{name}> outside any element")]
    UnexpectedEndTag { name: String },

    #[error("missing end tag for <{name}>")]
    UnclosedElement { name: String },

    #[error("parsing error in <{name}>")]
    ChildParse { name: String },

    #[error("element nesting deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("unterminated {construct}")]
    Unterminated { construct: &'static str },

    #[error("empty tag name")]
    EmptyTagName,

    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: String },
}
