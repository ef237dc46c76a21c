//! Markup tokenizer
//!
//! Pull tokenizer handing out one freshly allocated, unattached node per call.
//! It decides the kind, the value and the closing kind of every node; the
//! assembly step never looks at the text again.
//!
//! Recognized tokens:
//! - `<?...?>` declaration
//! - `<!--...-->` comment
//! - `<![CDATA[...]]>` text
//! - `<!...>` unknown markup (DOCTYPE and friends)
//! - `</name>`, `<name ...>`, `<name .../>` elements
//! - anything else up to the next `<` as text
//!
//! Attribute text inside start tags is skipped, not interpreted.

use crate::node::{ClosingKind, NodeKind};
use crate::report::Report;
use crate::tree::Tree;
use crate::{NodeId, ParseError};

/// Producer of typed, unattached nodes
pub trait NodeSource {
    /// Identify the next node and allocate it in `tree`
    ///
    /// Returns `None` at the end of input, and keeps returning `None` after.
    fn identify(&mut self, tree: &mut Tree, report: &mut dyn Report) -> Option<NodeId>;
}

/// Tokenizer over an in-memory document
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer positioned on line 1
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    /// Current line number
    pub fn line(&self) -> usize {
        self.line
    }

    /// Check if all input has been consumed
    pub fn is_done(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn advance(&mut self, len: usize) -> &'a str {
        let taken = &self.input[self.pos..self.pos + len];
        self.line += taken.bytes().filter(|&b| b == b'\n').count();
        self.pos += len;
        taken
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let len = rest.len() - rest.trim_start().len();
        self.advance(len);
    }

    /// Consume `open` + body + `close` and return the body
    fn delimited(
        &mut self,
        open: usize,
        close: &str,
        construct: &'static str,
        report: &mut dyn Report,
    ) -> Option<&'a str> {
        let line = self.line;
        match self.rest()[open..].find(close) {
            Some(len) => {
                let token = self.advance(open + len + close.len());
                Some(&token[open..open + len])
            }
            None => {
                report.report(line, ParseError::Unterminated { construct });
                self.advance(self.rest().len());
                None
            }
        }
    }

    fn end_tag(&mut self, report: &mut dyn Report) -> Option<(NodeKind, &'a str)> {
        let line = self.line;
        let name = self.delimited(2, ">", "end tag", report)?.trim();
        if name.is_empty() {
            report.report(line, ParseError::EmptyTagName);
            return Some((NodeKind::Unknown, name));
        }
        Some((NodeKind::Element(ClosingKind::Close), name))
    }

    fn start_tag(&mut self, report: &mut dyn Report) -> Option<(NodeKind, &'a str)> {
        let line = self.line;
        let mut quote = None;
        let end = self.rest().char_indices().skip(1).find_map(|(i, c)| {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '>') => return Some(i),
                _ => {}
            }
            None
        });
        let Some(end) = end else {
            report.report(line, ParseError::Unterminated { construct: "tag" });
            self.advance(self.rest().len());
            return None;
        };

        let tag = self.advance(end + 1);
        let inner = &tag[1..end];
        let (inner, closing) = match inner.strip_suffix('/') {
            Some(inner) => (inner, ClosingKind::SelfClosed),
            None => (inner, ClosingKind::Open),
        };
        let name_len = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let name = &inner[..name_len];
        if name.is_empty() {
            report.report(line, ParseError::EmptyTagName);
            return Some((NodeKind::Unknown, tag));
        }
        Some((NodeKind::Element(closing), name))
    }
}

impl NodeSource for Tokenizer<'_> {
    fn identify(&mut self, tree: &mut Tree, report: &mut dyn Report) -> Option<NodeId> {
        self.skip_whitespace();
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        let line = self.line;

        let (kind, value) = if rest.starts_with("<?") {
            let body = self.delimited(2, "?>", "declaration", report)?;
            (NodeKind::Declaration, body.trim())
        } else if rest.starts_with("<!--") {
            (NodeKind::Comment, self.delimited(4, "-->", "comment", report)?)
        } else if rest.starts_with("<![CDATA[") {
            (NodeKind::Text, self.delimited(9, "]]>", "CDATA section", report)?)
        } else if rest.starts_with("<!") {
            let body = self.delimited(2, ">", "markup declaration", report)?;
            (NodeKind::Unknown, body.trim())
        } else if rest.starts_with("</") {
            self.end_tag(report)?
        } else if rest.starts_with('<') {
            self.start_tag(report)?
        } else {
            let len = rest.find('<').unwrap_or(rest.len());
            (NodeKind::Text, self.advance(len))
        };

        tracing::trace!(line, %kind, value, "identified node");
        Some(tree.create(kind, value, line))
    }
}
