use xtract::document::{Matcher, Node, Record, explore_elements};
use xtract::operation::slice::{Bound, Slice};
use xtract::operation::step::{Step, StepKind};

use crate::environment::Variables;
use crate::printer;
use crate::sequence::reverse_complement;

/// Where a step is evaluated.
#[derive(Clone, Copy)]
pub struct Site<'a> {
    pub record: &'a Record,
    pub node: &'a Node,
    /// 1-based index of `node` among its block's matches.
    pub index: usize,
    pub level: usize,
}

impl<'a> Site<'a> {
    pub fn new(record: &'a Record, node: &'a Node, index: usize, level: usize) -> Self {
        Site {
            record,
            node,
            index,
            level,
        }
    }

    /// The elements under this site that `step` addresses, with their levels.
    pub fn elements(&self, step: &Step) -> Vec<(&'a Node, usize)> {
        let matcher = Matcher::new(step.parent.as_deref(), &step.name).wildcard(step.wildcard);
        let mut found = Vec::new();
        explore_elements(self.node, &matcher, self.level, &mut |node, level| {
            found.push((node, level));
        });
        found
    }
}

fn resolve(bound: &Bound, vars: &Variables, len: i64, open: i64) -> Option<i64> {
    let value = match bound {
        Bound::Open => return Some(open),
        Bound::Fixed(n) => *n,
        Bound::Variable { name, offset } => vars.get(name)?.trim().parse::<i64>().ok()? + offset,
    };
    Some(if value < 0 { len + value + 1 } else { value })
}

fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    lower.get(from..)?.find(&needle).map(|i| i + from)
}

/// Apply a range to `text`. Numeric bounds are 1-based and inclusive and
/// count characters. With `reverse_inverted`, bounds given as `[max:min]`
/// return the reverse complement of the window.
pub fn apply_slice(
    text: &str,
    slice: &Slice,
    vars: &Variables,
    reverse_inverted: bool,
) -> Option<String> {
    match slice {
        Slice::Whole => Some(text.to_string()),
        Slice::Delimited { after, before } => {
            let mut start = 0;
            if let Some(after) = after {
                start = find_ignore_case(text, after, 0)? + after.len();
            }
            let mut end = text.len();
            if let Some(before) = before {
                end = find_ignore_case(text, before, start)?;
            }
            text.get(start..end).map(str::to_string)
        }
        Slice::Bounds { min, max } => {
            let chars: Vec<char> = text.chars().collect();
            let len = chars.len() as i64;
            let mut lo = resolve(min, vars, len, 1)?;
            let mut hi = resolve(max, vars, len, len)?;
            let inverted = lo > hi;
            if inverted {
                if !reverse_inverted {
                    return None;
                }
                std::mem::swap(&mut lo, &mut hi);
            }
            let lo = lo.max(1);
            let hi = hi.min(len);
            if lo > hi {
                return None;
            }
            let window: String = chars[(lo - 1) as usize..hi as usize].iter().collect();
            Some(if inverted {
                reverse_complement(&window)
            } else {
                window
            })
        }
    }
}

/// Every value `step` yields at `site`, in document order, after slicing.
pub fn step_values(step: &Step, site: &Site<'_>, vars: &Variables, reverse_inverted: bool) -> Vec<String> {
    let raw: Vec<String> = match step.kind {
        StepKind::Element => {
            if step.name.is_empty() {
                match &step.attribute {
                    Some(attribute) => site
                        .node
                        .attribute(attribute, step.wildcard)
                        .map(str::to_string)
                        .into_iter()
                        .collect(),
                    None => Vec::new(),
                }
            } else {
                site.elements(step)
                    .into_iter()
                    .filter_map(|(node, _)| match &step.attribute {
                        Some(attribute) => node.attribute(attribute, step.wildcard).map(str::to_string),
                        None if node.contents.is_empty() => None,
                        None => Some(node.contents.clone()),
                    })
                    .collect()
            }
        }
        StepKind::Variable => vars.get(&step.name).map(str::to_string).into_iter().collect(),
        StepKind::Literal => vec![step.value.clone()],
        StepKind::Count => vec![site.elements(step).len().to_string()],
        StepKind::Length => {
            let total: usize = site
                .elements(step)
                .iter()
                .map(|(node, _)| node.contents.chars().count())
                .sum();
            vec![total.to_string()]
        }
        StepKind::Depth => site
            .elements(step)
            .last()
            .map(|(_, level)| level.to_string())
            .into_iter()
            .collect(),
        StepKind::Index => vec![site.index.to_string()],
        StepKind::NodeName => vec![site.node.name.clone()],
        StepKind::AttributeNames => site.node.attributes.iter().map(|(key, _)| key.clone()).collect(),
        StepKind::Dump(style) => vec![printer::dump(site.node, style)],
        StepKind::Constraint(_) => Vec::new(),
    };

    if step.slice.is_whole() {
        return raw;
    }
    raw.iter()
        .filter_map(|text| apply_slice(text, &step.slice, vars, reverse_inverted))
        .collect()
}
