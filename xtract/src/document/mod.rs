mod reader;

pub use reader::{is_inline, parse_record, split_records};

use std::ops::Range;

use thiserror::Error;

/// How element text is materialized from the record source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPolicy {
    /// Decode `&amp;`-style entity references in text and attribute values.
    pub unescape: bool,
    /// Keep inline formatting tags (`<i>`, `<sup>`, ...) as literal text in
    /// the surrounding element instead of dropping them.
    pub inline_markup: bool,
}

impl Default for TextPolicy {
    fn default() -> Self {
        TextPolicy {
            unescape: true,
            inline_markup: true,
        }
    }
}

/// Structural problems that make a record unusable.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("malformed record at byte {position}: {message}")]
    Malformed { position: usize, message: String },
    #[error("record has more than one root element")]
    MultipleRoots,
    #[error("unclosed element <{name}>")]
    Unclosed { name: String },
    #[error("record contains no elements")]
    Empty,
}

/// One element of a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: String,
    /// Name of the enclosing element; empty for the record root.
    pub parent: String,
    pub attributes: Vec<(String, String)>,
    /// Direct text content, trimmed.
    pub contents: String,
    pub children: Vec<Node>,
    /// Byte range of the whole element in the record source.
    pub span: Range<usize>,
}

impl Node {
    pub fn attribute(&self, name: &str, wildcard: bool) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| name_matches(key, name, wildcard))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_content(&self) -> bool {
        !self.contents.is_empty() || !self.children.is_empty() || !self.attributes.is_empty()
    }
}

/// A parsed record and the text it was parsed from.
#[derive(Debug, Clone)]
pub struct Record {
    pub source: String,
    pub root: Node,
}

impl Record {
    /// The source text of `node`, tags included.
    pub fn text_of(&self, node: &Node) -> &str {
        self.source.get(node.span.clone()).unwrap_or("")
    }
}

/// Element-name comparison. `*` matches anything; with `wildcard`, any
/// namespace prefix on `name` is ignored.
pub fn name_matches(name: &str, pattern: &str, wildcard: bool) -> bool {
    if pattern == "*" || name == pattern {
        return true;
    }
    if wildcard {
        let local = name.rsplit_once(':').map_or(name, |(_, local)| local);
        return local == pattern;
    }
    false
}

/// What an exploration is looking for.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    pub parent: Option<&'a str>,
    pub name: &'a str,
    pub wildcard: bool,
}

impl<'a> Matcher<'a> {
    pub fn new(parent: Option<&'a str>, name: &'a str) -> Self {
        Matcher {
            parent,
            name,
            wildcard: false,
        }
    }

    pub fn wildcard(mut self, wildcard: bool) -> Self {
        self.wildcard = wildcard;
        self
    }

    pub fn accepts(&self, node: &Node) -> bool {
        name_matches(&node.name, self.name, self.wildcard)
            && self
                .parent
                .is_none_or(|parent| name_matches(&node.parent, parent, self.wildcard))
    }
}

/// Visit the nodes a block selects under `node`, in document order.
///
/// `node` itself is tested first; a match is reported and not descended
/// into, otherwise the search continues through the children. A `*`
/// matcher selects the immediate children. The callback receives the
/// running match index and the nesting level.
pub fn explore_nodes<'n>(
    node: &'n Node,
    matcher: &Matcher<'_>,
    level: usize,
    callback: &mut dyn FnMut(&'n Node, usize, usize),
) {
    if matcher.name == "*" && matcher.parent.is_none() {
        for (index, child) in node.children.iter().enumerate() {
            callback(child, index, level + 1);
        }
        return;
    }
    let mut index = 0;
    visit_nodes(node, matcher, level, &mut index, callback);
}

fn visit_nodes<'n>(
    node: &'n Node,
    matcher: &Matcher<'_>,
    level: usize,
    index: &mut usize,
    callback: &mut dyn FnMut(&'n Node, usize, usize),
) {
    if matcher.accepts(node) {
        callback(node, *index, level);
        *index += 1;
        return;
    }
    for child in &node.children {
        visit_nodes(child, matcher, level + 1, index, callback);
    }
}

/// Visit every element under `node` (itself included) that `matcher`
/// accepts, depth-first in document order, with its nesting level.
pub fn explore_elements<'n>(
    node: &'n Node,
    matcher: &Matcher<'_>,
    level: usize,
    callback: &mut dyn FnMut(&'n Node, usize),
) {
    if matcher.accepts(node) {
        callback(node, level);
    }
    for child in &node.children {
        explore_elements(child, matcher, level + 1, callback);
    }
}

/// The immediate children of `node` named `name`.
pub fn children_named<'n>(node: &'n Node, name: &str, wildcard: bool) -> Vec<&'n Node> {
    node.children
        .iter()
        .filter(|child| name_matches(&child.name, name, wildcard))
        .collect()
}
