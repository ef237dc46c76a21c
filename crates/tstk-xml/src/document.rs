//! Document - parsing entry points and tree assembly
//!
//! Assembly is a recursive descent over a [`NodeSource`]. Each open element
//! becomes the container for the tokens that follow until its end tag, and
//! its own children are fully assembled before it is attached to its parent.
//! Failures are reported to the sink and summarized as a verdict per level;
//! they never unwind through the tree.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::node::{ClosingKind, Node, NodeKind};
use crate::report::Report;
use crate::tokenizer::{NodeSource, Tokenizer};
use crate::tree::Tree;
use crate::{NodeId, ParseError};

/// Parser configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum element nesting depth
    pub max_depth: usize,
}

impl ParseOptions {
    /// Hard ceiling on the nesting depth, whatever `max_depth` says
    ///
    /// Assembly recurses once per open element, so this bounds its stack use.
    pub const DEPTH_CEILING: usize = 1024;

    /// Nesting depth actually enforced during assembly
    pub fn depth_limit(&self) -> usize {
        self.max_depth.min(Self::DEPTH_CEILING)
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

/// Outcome of one assembly level, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Verdict {
    /// Everything well-formed
    Valid,
    /// Errors were reported but the container is kept
    Recovered,
    /// The container must be discarded by its parent
    Invalid,
}

#[derive(Debug)]
struct Outcome {
    verdict: Verdict,
    /// End tag of an ancestor, met while this container was still open
    pending_end_tag: Option<String>,
}

impl Outcome {
    fn closed(verdict: Verdict) -> Self {
        Self {
            verdict,
            pending_end_tag: None,
        }
    }
}

/// Sink wrapper counting what goes through
struct Tally<'r> {
    inner: &'r mut dyn Report,
    errors: usize,
}

impl Report for Tally<'_> {
    fn report(&mut self, line: usize, error: ParseError) {
        self.errors += 1;
        self.inner.report(line, error);
    }
}

/// Markup document: a tree rooted at a Document node
#[derive(Debug)]
pub struct Document {
    tree: Tree,
    root: NodeId,
    options: ParseOptions,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    /// Create an empty document with explicit parser options
    pub fn with_options(options: ParseOptions) -> Self {
        let mut tree = Tree::new();
        let root = tree.create(NodeKind::Document, "", 0);
        Self {
            tree,
            root,
            options,
        }
    }

    /// The Document node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// First element directly under the Document node
    pub fn root_element(&self) -> Option<NodeId> {
        self.tree
            .children(self.root)
            .find(|&child| self.tree.get(child).is_some_and(Node::is_element))
    }

    /// Access the node tree
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Access the node tree mutably
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Indented listing of the tree, for diagnostics
    pub fn outline(&self) -> Outline<'_> {
        Outline { document: self }
    }

    /// Drop every node below the Document node
    pub fn reset(&mut self) {
        if self.tree.clear(self.root).is_err() {
            // Only reachable if the root was removed through tree_mut()
            self.tree = Tree::new();
            self.root = self.tree.create(NodeKind::Document, "", 0);
        }
    }

    /// Parse a document held in a string
    pub fn parse(&mut self, text: &str, report: &mut dyn Report) -> bool {
        tracing::debug!("Parsing document: {} bytes", text.len());
        self.parse_from(&mut Tokenizer::new(text), report)
    }

    /// Parse a document given as a list of lines
    pub fn parse_lines<S: AsRef<str>>(&mut self, lines: &[S], report: &mut dyn Report) -> bool {
        let text = lines.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join("\n");
        self.parse(&text, report)
    }

    /// Load and parse a UTF-8 file
    pub fn load(&mut self, path: impl AsRef<Path>, report: &mut dyn Report) -> bool {
        let path = path.as_ref();
        tracing::debug!("Loading document: {}", path.display());

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.reset();
                report.report(
                    0,
                    ParseError::Io {
                        path: path.display().to_string(),
                        message: err.to_string(),
                    },
                );
                return false;
            }
        };
        match String::from_utf8(bytes) {
            Ok(text) => self.parse(text.strip_prefix('\u{feff}').unwrap_or(&text), report),
            Err(_) => {
                self.reset();
                report.report(
                    0,
                    ParseError::Encoding {
                        path: path.display().to_string(),
                    },
                );
                false
            }
        }
    }

    /// Parse from any node source
    ///
    /// The document is reset first. On failure the best-effort tree stays
    /// attached to the Document node.
    pub fn parse_from<S: NodeSource + ?Sized>(
        &mut self,
        source: &mut S,
        report: &mut dyn Report,
    ) -> bool {
        self.reset();
        let mut tally = Tally {
            inner: report,
            errors: 0,
        };
        let mut open = Vec::new();
        let outcome = self.assemble(source, self.root, &mut open, &mut tally);
        let success = outcome.verdict == Verdict::Valid && tally.errors == 0;

        tracing::debug!(
            "Parsed {} nodes, {} errors, success: {}",
            self.tree.len().saturating_sub(1),
            tally.errors,
            success
        );
        success
    }

    /// Fill `container` with nodes from `source` until its end
    ///
    /// `open` holds the names of the open elements, innermost last; it is
    /// empty when `container` is the Document node.
    fn assemble<S: NodeSource + ?Sized>(
        &mut self,
        source: &mut S,
        container: NodeId,
        open: &mut Vec<String>,
        report: &mut dyn Report,
    ) -> Outcome {
        let mut verdict = Verdict::Valid;

        while let Some(node) = source.identify(&mut self.tree, report) {
            let Some((kind, line)) = self.tree.get(node).map(|n| (n.kind(), n.source_line())) else {
                continue;
            };

            match kind {
                NodeKind::Element(ClosingKind::Close) => {
                    let name = self.value_of(node);
                    self.discard(node);
                    match open.last() {
                        Some(expected) if *expected == name => return Outcome::closed(verdict),
                        Some(expected) => {
                            report.report(
                                line,
                                ParseError::MismatchedEndTag {
                                    expected: expected.clone(),
                                    found: name.clone(),
                                },
                            );
                            let ancestors = &open[..open.len() - 1];
                            return Outcome {
                                verdict: verdict.max(Verdict::Recovered),
                                pending_end_tag: ancestors.contains(&name).then_some(name),
                            };
                        }
                        None => {
                            report.report(line, ParseError::UnexpectedEndTag { name });
                            verdict = verdict.max(Verdict::Recovered);
                        }
                    }
                }
                NodeKind::Element(ClosingKind::Open) => {
                    let limit = self.options.depth_limit();
                    if open.len() >= limit {
                        report.report(line, ParseError::TooDeep { limit });
                        self.discard(node);
                        self.skip_subtree(source, report);
                        verdict = Verdict::Invalid;
                        continue;
                    }

                    let name = self.value_of(node);
                    open.push(name.clone());
                    let inner = self.assemble(source, node, open, report);
                    open.pop();

                    if inner.verdict == Verdict::Invalid {
                        report.report(line, ParseError::ChildParse { name });
                        self.discard(node);
                        verdict = Verdict::Invalid;
                    } else {
                        verdict = verdict.max(inner.verdict).max(self.attach(node, container));
                    }

                    if let Some(end_tag) = inner.pending_end_tag {
                        if open.last() == Some(&end_tag) {
                            return Outcome::closed(verdict);
                        }
                        return Outcome {
                            verdict,
                            pending_end_tag: Some(end_tag),
                        };
                    }
                }
                NodeKind::Declaration => match self.misplaced_declaration(container) {
                    Some(error) => {
                        report.report(line, error);
                        self.discard(node);
                        verdict = Verdict::Invalid;
                    }
                    None => verdict = verdict.max(self.attach(node, container)),
                },
                _ => verdict = verdict.max(self.attach(node, container)),
            }
        }

        if let Some(name) = open.last() {
            let line = self.tree.get(container).map_or(0, Node::source_line);
            report.report(line, ParseError::UnclosedElement { name: name.clone() });
            verdict = verdict.max(Verdict::Recovered);
        }
        Outcome::closed(verdict)
    }

    /// Declarations are only accepted as a prefix of the Document's children
    fn misplaced_declaration(&self, container: NodeId) -> Option<ParseError> {
        if container != self.root {
            return Some(ParseError::DeclarationNotAtRoot);
        }
        let after_content = self
            .tree
            .children(container)
            .any(|child| !self.tree.get(child).is_some_and(Node::is_declaration));
        after_content.then_some(ParseError::DeclarationAfterContent)
    }

    /// Consume tokens up to the end tag balancing an already consumed start tag
    fn skip_subtree<S: NodeSource + ?Sized>(&mut self, source: &mut S, report: &mut dyn Report) {
        let mut depth = 1usize;
        while depth > 0 {
            let Some(node) = source.identify(&mut self.tree, report) else {
                break;
            };
            match self.tree.get(node).and_then(Node::closing) {
                Some(ClosingKind::Open) => depth += 1,
                Some(ClosingKind::Close) => depth -= 1,
                _ => {}
            }
            self.discard(node);
        }
    }

    fn attach(&mut self, node: NodeId, container: NodeId) -> Verdict {
        match self.tree.reparent(node, Some(container)) {
            Ok(()) => {
                tracing::trace!(index = node.index(), "attached node");
                Verdict::Valid
            }
            Err(err) => {
                tracing::error!("Cannot attach parsed node: {}", err);
                self.discard(node);
                Verdict::Invalid
            }
        }
    }

    fn discard(&mut self, node: NodeId) {
        // Stale handles have nothing left to free
        let _ = self.tree.remove(node);
    }

    fn value_of(&self, node: NodeId) -> String {
        self.tree
            .get(node)
            .map(|n| n.value().to_string())
            .unwrap_or_default()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Indented listing of a document, one node per line
pub struct Outline<'a> {
    document: &'a Document,
}

impl Outline<'_> {
    fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        match node.kind() {
            NodeKind::Document => writeln!(f, "{:indent$}Document", "")?,
            NodeKind::Element(ClosingKind::SelfClosed) => writeln!(
                f,
                "{:indent$}<{}/> (line {})",
                "",
                node.value(),
                node.source_line()
            )?,
            NodeKind::Element(_) => writeln!(
                f,
                "{:indent$}<{}> (line {})",
                "",
                node.value(),
                node.source_line()
            )?,
            kind => writeln!(
                f,
                "{:indent$}{} {:?} (line {})",
                "",
                kind,
                node.value(),
                node.source_line()
            )?,
        }
        Ok(())
    }
}

impl fmt::Display for Outline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.document.tree();
        // Depth-first with an explicit stack, children pushed in reverse
        let mut pending = vec![(self.document.root(), 0)];
        while let Some((id, depth)) = pending.pop() {
            let Some(node) = tree.get(id) else {
                continue;
            };
            Self::write_node(f, node, depth)?;
            let children: Vec<NodeId> = tree.children(id).collect();
            pending.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
        Ok(())
    }
}
