use std::ops::Range;

use crate::operation::Comparison;
use crate::operation::slice::Slice;

/// Serialization styles for the structural dump items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dump {
    /// `.` nested bracket notation.
    Bracket,
    /// `%` JSON-like notation.
    Json,
    /// `*` through `****`, one to four levels of XML compression.
    Xml(u8),
}

/// How a step retrieves its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Element text or attribute value.
    Element,
    /// `&NAME`
    Variable,
    /// `#name`
    Count,
    /// `%name`
    Length,
    /// `^name`
    Depth,
    /// `+`
    Index,
    /// `?`
    NodeName,
    /// `@`
    AttributeNames,
    Dump(Dump),
    /// `"(text)"`
    Literal,
    /// Right-hand side of a condition.
    Constraint(Comparison),
}

/// One addressing unit: `parent/element@attribute[slice]` plus a retrieval kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub kind: StepKind,
    pub parent: Option<String>,
    /// Element name, variable name, or empty for the current node.
    pub name: String,
    pub attribute: Option<String>,
    /// Set by a leading `:`, matching any namespace prefix.
    pub wildcard: bool,
    pub slice: Slice,
    /// Literal text or comparison operand, as written.
    pub value: String,
    pub span: Range<usize>,
}

impl Step {
    pub fn new(kind: StepKind, span: Range<usize>) -> Self {
        Step {
            kind,
            parent: None,
            name: String::new(),
            attribute: None,
            wildcard: false,
            slice: Slice::Whole,
            value: String::new(),
            span,
        }
    }

    /// A comparison step whose operand is `value`.
    pub fn constraint(comparison: Comparison, value: &str, span: Range<usize>) -> Self {
        let mut step = Step::new(StepKind::Constraint(comparison), span);
        step.value = value.to_string();
        if let Some(name) = value.strip_prefix('&') {
            step.name = name.to_string();
        } else {
            let (parent, name, attribute, wildcard) = split_address(value);
            step.parent = parent;
            step.name = name;
            step.attribute = attribute;
            step.wildcard = wildcard;
        }
        step
    }

    /// True when the step addresses the current node rather than a descendant.
    pub fn is_current_node(&self) -> bool {
        self.name.is_empty() && self.parent.is_none()
    }
}

/// Split `parent/element@attribute` into its components.
/// A leading `:` on any component requests namespace-wildcard matching.
pub fn split_address(text: &str) -> (Option<String>, String, Option<String>, bool) {
    let mut wildcard = false;
    let mut strip = |s: &str| -> String {
        match s.strip_prefix(':') {
            Some(rest) => {
                wildcard = true;
                rest.to_string()
            }
            None => s.to_string(),
        }
    };

    let (parent, rest) = match text.rsplit_once('/') {
        Some((parent, rest)) if !parent.is_empty() => (Some(strip(parent)), rest),
        Some((_, rest)) => (None, rest),
        None => (None, text),
    };
    let (element, attribute) = match rest.split_once('@') {
        Some((element, attribute)) => (strip(element), Some(strip(attribute))),
        None => (strip(rest), None),
    };
    (parent, element, attribute, wildcard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_components() {
        assert_eq!(
            split_address("Author/LastName"),
            (Some("Author".into()), "LastName".into(), None, false)
        );
        assert_eq!(
            split_address("DescriptorName@MajorTopicYN"),
            (None, "DescriptorName".into(), Some("MajorTopicYN".into()), false)
        );
        assert_eq!(split_address("@ValidYN"), (None, "".into(), Some("ValidYN".into()), false));
        assert_eq!(split_address(":Title"), (None, "Title".into(), None, true));
    }
}
