//! Document nodes
//!
//! A node is the payload of one arena slot: its kind, its text value, the
//! input line it came from, and the structural links maintained by
//! [`Tree`](crate::Tree). Links are raw slot indices and never leave the
//! crate; callers navigate through the tree with checked [`NodeId`](crate::NodeId)s.

use std::fmt;

use crate::ring::RingLink;

/// How an element token is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClosingKind {
    /// `<name>`: has children and a matching end tag
    Open,
    /// `<name/>`
    SelfClosed,
    /// `</name>`: consumed by assembly, never attached
    Close,
}

/// Kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// `<?...?>`
    Declaration,
    /// Element, value is the tag name
    Element(ClosingKind),
    /// Character data
    Text,
    /// `<!--...-->`
    Comment,
    /// Other markup such as `<!DOCTYPE ...>`
    Unknown,
}

impl NodeKind {
    /// Check if this is a declaration
    #[inline]
    pub fn is_declaration(self) -> bool {
        matches!(self, NodeKind::Declaration)
    }

    /// Closing kind if this is an element
    #[inline]
    pub fn closing(self) -> Option<ClosingKind> {
        match self {
            NodeKind::Element(closing) => Some(closing),
            _ => None,
        }
    }

    /// Check if nodes of this kind may own children
    #[inline]
    pub fn can_hold_children(self) -> bool {
        matches!(
            self,
            NodeKind::Document | NodeKind::Element(ClosingKind::Open | ClosingKind::SelfClosed)
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Document => write!(f, "Document"),
            NodeKind::Declaration => write!(f, "Declaration"),
            NodeKind::Element(_) => write!(f, "Element"),
            NodeKind::Text => write!(f, "Text"),
            NodeKind::Comment => write!(f, "Comment"),
            NodeKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Arena-resident node
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    value: String,
    line: usize,
    pub(crate) parent: Option<u32>,
    /// Ring anchor: oldest attached child
    pub(crate) first_child: Option<u32>,
    pub(crate) ring: RingLink<u32>,
}

impl Node {
    pub(crate) fn new(index: u32, kind: NodeKind, value: String, line: usize) -> Self {
        Self {
            kind,
            value,
            line,
            parent: None,
            first_child: None,
            ring: RingLink::alone(index),
        }
    }

    /// Kind of the node
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Text payload; its meaning depends on the kind
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the text payload
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// 1-based input line, 0 when the node was not read from text
    #[inline]
    pub fn source_line(&self) -> usize {
        self.line
    }

    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.kind.is_declaration()
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    /// Closing kind if this is an element
    #[inline]
    pub fn closing(&self) -> Option<ClosingKind> {
        self.kind.closing()
    }

    /// Check if the node has at least one child
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.value.clear();
        self.line = 0;
    }
}
