//! Edge case and stress tests for tstk-xml
//!
//! Malformed markup, recovery paths, file loading and custom node sources.

use std::fs;
use std::path::PathBuf;

use tstk_xml::{
    ClosingKind, Document, ErrorList, NodeId, NodeKind, NodeSource, NullReport, ParseError,
    ParseOptions, Report, Tree,
};

fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tstk-xml-{}-{}", std::process::id(), name));
    fs::write(&path, contents).unwrap();
    path
}

// ============================================================================
// EMPTY AND MINIMAL INPUT
// ============================================================================

#[test]
fn test_parse_empty() {
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(doc.parse("", &mut errors));
    assert_eq!(doc.tree().len(), 1);
    assert!(doc.root_element().is_none());
}

#[test]
fn test_parse_only_whitespace() {
    let mut doc = Document::new();
    assert!(doc.parse("   \t\n\r\n   ", &mut NullReport));
    assert_eq!(doc.tree().len(), 1);
}

#[test]
fn test_parse_only_declaration() {
    let mut doc = Document::new();
    assert!(doc.parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?>", &mut NullReport));
    let decl = doc.tree().first_child(doc.root()).unwrap();
    assert!(doc.tree().get(decl).unwrap().is_declaration());
}

// ============================================================================
// MALFORMED MARKUP
// ============================================================================

#[test]
fn test_orphan_end_tag() {
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(!doc.parse("<a/></b><c/>", &mut errors));
    assert_eq!(
        errors.errors(),
        &[(1, ParseError::UnexpectedEndTag { name: "b".into() })]
    );
    // Assembly went on after the stray end tag
    assert_eq!(doc.tree().child_count(doc.root()), 2);
}

#[test]
fn test_unclosed_element() {
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(!doc.parse("<a>\n<b>text", &mut errors));
    assert_eq!(
        errors.errors(),
        &[
            (2, ParseError::UnclosedElement { name: "b".into() }),
            (1, ParseError::UnclosedElement { name: "a".into() }),
        ]
    );
    let a = doc.root_element().unwrap();
    let b = doc.tree().first_child(a).unwrap();
    assert_eq!(doc.tree().child_count(b), 1);
}

#[test]
fn test_unknown_end_tag_aborts_container() {
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(!doc.parse("<a><b></x><c/></a>", &mut errors));
    assert_eq!(
        errors.errors()[0],
        (
            1,
            ParseError::MismatchedEndTag {
                expected: "b".into(),
                found: "x".into(),
            }
        )
    );
    // </x> closed b, so c lands under a
    let tree = doc.tree();
    let a = doc.root_element().unwrap();
    let b = tree.first_child(a).unwrap();
    let c = tree.next_sibling(b).unwrap();
    assert_eq!(tree.get(c).unwrap().value(), "c");
    assert_eq!(tree.first_child(b), None);
}

#[test]
fn test_end_tag_closes_distant_ancestor() {
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(!doc.parse("<a><b><c><d/></a><e/>", &mut errors));
    assert_eq!(errors.len(), 1);

    // b and c were left open but kept; e follows a at the root
    let tree = doc.tree();
    let a = doc.root_element().unwrap();
    let e = tree.next_sibling(a).unwrap();
    assert_eq!(tree.get(e).unwrap().value(), "e");
    let b = tree.first_child(a).unwrap();
    let c = tree.first_child(b).unwrap();
    let d = tree.first_child(c).unwrap();
    assert_eq!(tree.get(d).unwrap().closing(), Some(ClosingKind::SelfClosed));
}

#[test]
fn test_nesting_limit() {
    let mut doc = Document::with_options(ParseOptions { max_depth: 2 });
    let mut errors = ErrorList::new();
    assert!(!doc.parse("<a><b><c><d/></c></b><z/></a><after/>", &mut errors));
    assert_eq!(
        errors.errors(),
        &[
            (1, ParseError::TooDeep { limit: 2 }),
            (1, ParseError::ChildParse { name: "b".into() }),
            (1, ParseError::ChildParse { name: "a".into() }),
        ]
    );
    // The skipped subtree did not leak tokens into a sibling position
    let tree = doc.tree();
    let after = tree.first_child(doc.root()).unwrap();
    assert_eq!(tree.get(after).unwrap().value(), "after");
    assert_eq!(tree.len(), 2);
}

#[test]
fn test_unterminated_tag_fails() {
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(!doc.parse("<a/><b attr=\"x", &mut errors));
    assert_eq!(
        errors.errors(),
        &[(1, ParseError::Unterminated { construct: "tag" })]
    );
    assert_eq!(doc.tree().child_count(doc.root()), 1);
}

#[test]
fn test_deep_nesting_within_limit() {
    let depth = 200;
    let text = format!("{}{}", "<n>".repeat(depth), "</n>".repeat(depth));
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(doc.parse(&text, &mut errors));
    assert_eq!(doc.tree().len(), depth + 1);
}

#[test]
fn test_remove_very_deep_chain() {
    let depth = 200_000;
    let mut tree = Tree::new();
    let mut top = tree.create(NodeKind::Element(ClosingKind::Open), "n", 0);
    // Built bottom-up so each reparent walks a single ancestor
    for _ in 1..depth {
        let parent = tree.create(NodeKind::Element(ClosingKind::Open), "n", 0);
        tree.reparent(top, Some(parent)).unwrap();
        top = parent;
    }
    assert_eq!(tree.len(), depth);

    assert_eq!(tree.remove(top).unwrap(), depth);
    assert!(tree.is_empty());
    assert!(!tree.contains(top));
}

#[test]
fn test_reset_very_deep_document() {
    let depth = 200_000;
    let mut doc = Document::new();
    let tree = doc.tree_mut();
    let mut top = tree.create(NodeKind::Element(ClosingKind::Open), "n", 0);
    for _ in 1..depth {
        let parent = tree.create(NodeKind::Element(ClosingKind::Open), "n", 0);
        tree.reparent(top, Some(parent)).unwrap();
        top = parent;
    }
    let root = doc.root();
    doc.tree_mut().reparent(top, Some(root)).unwrap();
    assert_eq!(doc.tree().len(), depth + 1);

    doc.reset();
    assert_eq!(doc.tree().len(), 1);
    assert_eq!(doc.tree().first_child(doc.root()), None);
}

#[test]
fn test_many_siblings() {
    let text = format!("<list>{}</list>", "<item/>".repeat(1000));
    let mut doc = Document::new();
    assert!(doc.parse(&text, &mut NullReport));
    let list = doc.root_element().unwrap();
    assert_eq!(doc.tree().child_count(list), 1000);
}

// ============================================================================
// FILE LOADING
// ============================================================================

#[test]
fn test_load_missing_file() {
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(!doc.load("/nonexistent/tstk/table.xml", &mut errors));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.errors()[0].0, 0);
    assert!(matches!(errors.errors()[0].1, ParseError::Io { .. }));
}

#[test]
fn test_load_with_bom() {
    let path = temp_file("bom.xml", "\u{feff}<?xml version=\"1.0\"?>\n<tsduck/>".as_bytes());
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(doc.load(&path, &mut errors), "{:?}", errors);
    assert_eq!(doc.tree().child_count(doc.root()), 2);
    fs::remove_file(path).ok();
}

#[test]
fn test_load_invalid_utf8() {
    let path = temp_file("latin1.xml", b"<a>\xe9t\xe9</a>");
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(!doc.load(&path, &mut errors));
    assert!(matches!(errors.errors()[0].1, ParseError::Encoding { .. }));
    fs::remove_file(path).ok();
}

// ============================================================================
// CUSTOM NODE SOURCE
// ============================================================================

/// Replays a fixed list of tokens
struct Script {
    tokens: Vec<(NodeKind, &'static str)>,
    next: usize,
}

impl NodeSource for Script {
    fn identify(&mut self, tree: &mut Tree, _report: &mut dyn Report) -> Option<NodeId> {
        let (kind, value) = *self.tokens.get(self.next)?;
        self.next += 1;
        Some(tree.create(kind, value, self.next))
    }
}

#[test]
fn test_parse_from_custom_source() {
    let mut script = Script {
        tokens: vec![
            (NodeKind::Declaration, "xml"),
            (NodeKind::Element(ClosingKind::Open), "pmt"),
            (NodeKind::Element(ClosingKind::SelfClosed), "component"),
            (NodeKind::Comment, "video"),
            (NodeKind::Element(ClosingKind::Close), "pmt"),
        ],
        next: 0,
    };
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(doc.parse_from(&mut script, &mut errors));

    let tree = doc.tree();
    let pmt = doc.root_element().unwrap();
    assert_eq!(tree.get(pmt).unwrap().source_line(), 2);
    assert_eq!(tree.child_count(pmt), 2);
    // The end tag token was consumed and freed, never attached
    assert_eq!(tree.len(), 5);
}

/// Destroys the document root instead of producing tokens
struct Vandal {
    root: NodeId,
}

impl NodeSource for Vandal {
    fn identify(&mut self, tree: &mut Tree, _report: &mut dyn Report) -> Option<NodeId> {
        tree.remove(self.root).ok();
        None
    }
}

#[test]
fn test_source_removing_root() {
    let mut doc = Document::new();
    let mut vandal = Vandal { root: doc.root() };
    doc.parse_from(&mut vandal, &mut NullReport);
    assert!(doc.tree().is_empty());

    // The next parse starts from a fresh root
    assert!(doc.parse("<a/>", &mut NullReport));
    assert_eq!(doc.tree().len(), 2);
    assert!(doc.root_element().is_some());
}

#[test]
fn test_reparse_after_failure() {
    let mut doc = Document::new();
    let mut errors = ErrorList::new();
    assert!(!doc.parse("<a><b></a>", &mut errors));
    errors.take();
    assert!(doc.parse("<ok/>", &mut errors));
    assert!(errors.is_empty());
    assert_eq!(doc.tree().len(), 2);
}
