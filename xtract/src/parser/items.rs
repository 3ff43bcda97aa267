use std::ops::Range;

use crate::operation::slice::{Bound, Slice};
use crate::operation::step::{Dump, Step, StepKind, split_address};
use crate::parser::error::ParseError;
use crate::parser::tokens::is_variable_name;

/// Split a token at commas that are not inside `[...]` or `(...)`.
/// Returns each item with its byte offset in the token.
pub fn split_items(token: &str) -> Vec<(usize, &str)> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in token.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            ',' if depth <= 0 => {
                items.push((start, &token[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push((start, &token[start..]));
    items
}

/// Split the deprecated `element:value` form used by `-match` and `-avoid`.
///
/// The separator is the first colon outside a slice that does not open a
/// component, so `:Title:abc` keeps its namespace wildcard.
pub fn split_inline_value(text: &str) -> (&str, Option<&str>) {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth -= 1,
            b':' if depth == 0 && i > 0 && bytes[i - 1] != b'/' && bytes[i - 1] != b'@' => {
                return (&text[..i], Some(&text[i + 1..]));
            }
            _ => {}
        }
    }
    (text, None)
}

/// Parse one addressable item into a step.
pub fn parse_item(text: &str, span: Range<usize>, file_id: usize) -> Result<Step, ParseError> {
    let fail = |message: String| ParseError::error(message, span.clone(), file_id);

    if text.is_empty() {
        return Err(fail("empty item".to_string()));
    }
    if text.len() >= 2 && text.starts_with('(') && text.ends_with(')') {
        let mut step = Step::new(StepKind::Literal, span.clone());
        step.value = text[1..text.len() - 1].to_string();
        return Ok(step);
    }

    let special = match text {
        "." => Some(StepKind::Dump(Dump::Bracket)),
        "%" => Some(StepKind::Dump(Dump::Json)),
        "*" => Some(StepKind::Dump(Dump::Xml(1))),
        "**" => Some(StepKind::Dump(Dump::Xml(2))),
        "***" => Some(StepKind::Dump(Dump::Xml(3))),
        "****" => Some(StepKind::Dump(Dump::Xml(4))),
        "?" => Some(StepKind::NodeName),
        "@" => Some(StepKind::AttributeNames),
        "+" => Some(StepKind::Index),
        _ => None,
    };
    if let Some(kind) = special {
        let mut step = Step::new(kind, span);
        step.value = text.to_string();
        return Ok(step);
    }

    let (body, slice) = split_slice(text, &span, file_id)?;
    let (kind, rest) = match body.as_bytes().first() {
        Some(b'&') => (StepKind::Variable, &body[1..]),
        Some(b'#') => (StepKind::Count, &body[1..]),
        Some(b'%') => (StepKind::Length, &body[1..]),
        Some(b'^') => (StepKind::Depth, &body[1..]),
        _ => (StepKind::Element, body),
    };
    if rest.is_empty() {
        return Err(fail(format!("missing element name in '{}'", text)));
    }

    let mut step = Step::new(kind, span.clone());
    step.slice = slice;
    step.value = text.to_string();

    if kind == StepKind::Variable {
        if !is_variable_name(rest) {
            return Err(fail(format!("invalid variable reference '&{}'", rest))
                .with_note("variable names are uppercase letters and digits"));
        }
        step.name = rest.to_string();
        return Ok(step);
    }

    let (parent, name, attribute, wildcard) = split_address(rest);
    if name.is_empty() && attribute.is_none() {
        return Err(fail(format!("missing element name in '{}'", text)));
    }
    if matches!(attribute.as_deref(), Some("")) {
        return Err(fail(format!("missing attribute name in '{}'", text)));
    }
    if matches!(parent.as_deref(), Some("")) {
        return Err(fail(format!("missing parent name in '{}'", text)));
    }
    step.parent = parent;
    step.name = name;
    step.attribute = attribute;
    step.wildcard = wildcard;
    Ok(step)
}

/// Separate a trailing `[...]` from an item.
fn split_slice<'a>(
    text: &'a str,
    span: &Range<usize>,
    file_id: usize,
) -> Result<(&'a str, Slice), ParseError> {
    match text.find('[') {
        Some(open) => {
            if !text.ends_with(']') {
                return Err(ParseError::error(
                    format!("missing ']' in '{}'", text),
                    span.clone(),
                    file_id,
                ));
            }
            let body = &text[open + 1..text.len() - 1];
            let slice = parse_slice(body)
                .map_err(|message| ParseError::error(message, span.clone(), file_id))?;
            Ok((&text[..open], slice))
        }
        None if text.ends_with(']') => Err(ParseError::error(
            format!("unmatched ']' in '{}'", text),
            span.clone(),
            file_id,
        )),
        None => Ok((text, Slice::Whole)),
    }
}

/// Parse the inside of `[...]`.
pub fn parse_slice(body: &str) -> Result<Slice, String> {
    if body.is_empty() {
        return Err("empty range".to_string());
    }

    if let Some((left, right)) = body.split_once('|') {
        for side in [left, right] {
            if let Some((a, b)) = side.split_once(':') {
                if looks_like_bound(a) && looks_like_bound(b) {
                    return Err(format!(
                        "range '{}' mixes '|' delimiters with numeric bounds",
                        body
                    ));
                }
            }
        }
        if left.is_empty() && right.is_empty() {
            return Err("empty range".to_string());
        }
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        return Ok(Slice::Delimited {
            after: non_empty(left),
            before: non_empty(right),
        });
    }

    let (lo, hi) = body.split_once(':').unwrap_or((body, body));
    if lo.is_empty() && hi.is_empty() {
        return Err("empty range".to_string());
    }
    Ok(Slice::Bounds {
        min: parse_bound(lo, "minimum")?,
        max: parse_bound(hi, "maximum")?,
    })
}

fn looks_like_bound(s: &str) -> bool {
    if s.is_empty() || s.starts_with('&') {
        return true;
    }
    let digits = s.trim_start_matches(['-', '+']);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn parse_bound(text: &str, which: &str) -> Result<Bound, String> {
    if text.is_empty() {
        return Ok(Bound::Open);
    }

    if let Some(reference) = text.strip_prefix('&') {
        let end = reference.find(['+', '-']).unwrap_or(reference.len());
        let (name, offset) = reference.split_at(end);
        if !is_variable_name(name) {
            return Err(format!("invalid variable '&{}' in range {}", name, which));
        }
        let offset = if offset.is_empty() {
            0
        } else {
            offset
                .parse::<i64>()
                .map_err(|_| format!("malformed offset '{}' in range {}", offset, which))?
        };
        return Ok(Bound::Variable {
            name: name.to_string(),
            offset,
        });
    }

    let value = text
        .parse::<i64>()
        .map_err(|_| format!("non-numeric range {} '{}'", which, text))?;
    if value == 0 {
        return Err(format!("range {} must not be zero", which));
    }
    Ok(Bound::Fixed(value))
}
