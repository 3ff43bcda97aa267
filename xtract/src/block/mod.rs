pub mod position;

use std::ops::Range;

use crate::block::position::Position;
use crate::operation::{Level, Operation};

/// One exploration scope: "for each matching node, test, extract, then descend".
#[derive(Debug, Clone)]
pub struct Block {
    pub level: Level,
    /// The exploration argument as written (`Parent/Match`, `a.b.c`, `*`).
    pub visit: String,
    /// Required parent element name of a match.
    pub parent: Option<String>,
    /// Element name of the first match. `*` visits every child.
    pub matcher: String,
    /// Further path components, each an immediate child of the previous one.
    pub path: Vec<String>,
    pub position: Position,
    pub foreword: String,
    pub afterword: String,
    pub conditions: Vec<Operation>,
    pub commands: Vec<Operation>,
    /// Commands after `-else`, run when the conditions fail.
    pub failure: Vec<Operation>,
    pub children: Vec<Block>,
    /// Byte span in the reconstructed command line.
    pub span: Range<usize>,
}

impl Block {
    /// The synthetic scope holding the `-pattern` block.
    pub fn root(pattern: &str, child: Block) -> Self {
        let span = child.span.clone();
        Block {
            level: Level::Root,
            visit: pattern.to_string(),
            parent: None,
            matcher: pattern.to_string(),
            path: Vec::new(),
            position: Position::All,
            foreword: String::new(),
            afterword: String::new(),
            conditions: Vec::new(),
            commands: Vec::new(),
            failure: Vec::new(),
            children: vec![child],
            span,
        }
    }

    /// The `-pattern` scope under the synthetic root.
    pub fn pattern(&self) -> Option<&Block> {
        match self.level {
            Level::Root => self.children.first(),
            Level::Pattern => Some(self),
            _ => None,
        }
    }

    /// True when this block or any descendant produces output.
    pub fn produces_output(&self) -> bool {
        !self.commands.is_empty()
            || !self.failure.is_empty()
            || self.position == Position::Select
            || !self.foreword.is_empty()
            || !self.afterword.is_empty()
            || self.children.iter().any(Block::produces_output)
    }
}

/// Decompose an exploration argument into parent, match, and path.
///
/// `Parent/Match` is rewritten to `Parent.Match`. One dot names a parent
/// constraint; two or more dots make a child path.
pub fn decompose_visit(visit: &str) -> (Option<String>, String, Vec<String>) {
    let dotted = if visit.contains('.') {
        visit.to_string()
    } else {
        visit.replace('/', ".")
    };
    let mut parts: Vec<String> = dotted.split('.').map(str::to_string).collect();
    match parts.len() {
        1 => (None, parts.remove(0), Vec::new()),
        2 => {
            let matcher = parts.remove(1);
            (Some(parts.remove(0)), matcher, Vec::new())
        }
        _ => {
            let first = parts.remove(0);
            (None, first, parts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_forms() {
        assert_eq!(decompose_visit("Author"), (None, "Author".into(), vec![]));
        assert_eq!(
            decompose_visit("AuthorList/Author"),
            (Some("AuthorList".into()), "Author".into(), vec![])
        );
        assert_eq!(
            decompose_visit("AuthorList.Author"),
            (Some("AuthorList".into()), "Author".into(), vec![])
        );
        assert_eq!(
            decompose_visit("Article.AuthorList.Author"),
            (None, "Article".into(), vec!["AuthorList".into(), "Author".into()])
        );
        assert_eq!(
            decompose_visit("Article/AuthorList/Author"),
            (None, "Article".into(), vec!["AuthorList".into(), "Author".into()])
        );
    }
}
