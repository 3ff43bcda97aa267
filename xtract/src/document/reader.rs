use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::document::{Node, Record, RecordError, TextPolicy};

/// Formatting tags that stay inside their element's text.
const INLINE_TAGS: &[&str] = &[
    "b", "i", "u", "sub", "sup", "em", "strong", "tt", "small", "smallcaps", "underline",
];

/// True for formatting tags kept inside element text.
pub fn is_inline(name: &str) -> bool {
    INLINE_TAGS.contains(&name)
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn malformed(reader: &Reader<&[u8]>, err: impl ToString) -> RecordError {
    RecordError::Malformed {
        position: reader.error_position() as usize,
        message: err.to_string(),
    }
}

fn open_node(
    start: &BytesStart<'_>,
    parent: &str,
    offset: usize,
    policy: TextPolicy,
) -> Node {
    let attributes = start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = decode(attr.key.as_ref());
            let value = if policy.unescape {
                attr.unescape_value()
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| decode(&attr.value))
            } else {
                decode(&attr.value)
            };
            (key, value)
        })
        .collect();
    Node {
        name: decode(start.name().as_ref()),
        parent: parent.to_string(),
        attributes,
        contents: String::new(),
        children: Vec::new(),
        span: offset..offset,
    }
}

fn append_text(stack: &mut [Node], text: &str) {
    if let Some(node) = stack.last_mut() {
        node.contents.push_str(text);
    }
}

/// Parse one record into a node tree.
///
/// When `parent_tag` is not empty, the record root must carry that name.
pub fn parse_record(
    text: &str,
    parent_tag: &str,
    policy: TextPolicy,
) -> Result<Record, RecordError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;
    // depth of inline tags opened inside the current element
    let mut inline_depth = 0usize;

    loop {
        let offset = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|err| malformed(&reader, err))?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(start) => {
                let name = decode(start.name().as_ref());
                if !stack.is_empty() && is_inline(&name) {
                    inline_depth += 1;
                    if policy.inline_markup {
                        append_text(&mut stack, &text[offset..end]);
                    }
                    continue;
                }
                if stack.is_empty() && root.is_some() {
                    return Err(RecordError::MultipleRoots);
                }
                let parent = stack.last().map(|n| n.name.clone()).unwrap_or_default();
                stack.push(open_node(&start, &parent, offset, policy));
            }
            Event::Empty(start) => {
                let name = decode(start.name().as_ref());
                if !stack.is_empty() && is_inline(&name) {
                    if policy.inline_markup {
                        append_text(&mut stack, &text[offset..end]);
                    }
                    continue;
                }
                let parent = stack.last().map(|n| n.name.clone()).unwrap_or_default();
                let mut node = open_node(&start, &parent, offset, policy);
                node.span = offset..end;
                match stack.last_mut() {
                    Some(top) => top.children.push(node),
                    None if root.is_some() => return Err(RecordError::MultipleRoots),
                    None => root = Some(node),
                }
            }
            Event::End(close) => {
                let name = decode(close.name().as_ref());
                if inline_depth > 0 && is_inline(&name) {
                    inline_depth -= 1;
                    if policy.inline_markup {
                        append_text(&mut stack, &text[offset..end]);
                    }
                    continue;
                }
                let Some(mut node) = stack.pop() else {
                    return Err(RecordError::Malformed {
                        position: offset,
                        message: format!("unexpected </{}>", name),
                    });
                };
                node.span = node.span.start..end;
                node.contents = node.contents.trim().to_string();
                match stack.last_mut() {
                    Some(top) => top.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::Text(raw) => {
                if stack.is_empty() {
                    continue;
                }
                let value = if policy.unescape {
                    raw.unescape()
                        .map(Cow::into_owned)
                        .unwrap_or_else(|_| decode(&raw))
                } else {
                    decode(&raw)
                };
                append_text(&mut stack, &value);
            }
            Event::CData(data) => append_text(&mut stack, &decode(&data)),
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(RecordError::Unclosed { name: open.name });
    }
    let root = root.ok_or(RecordError::Empty)?;
    if !parent_tag.is_empty() && root.name != parent_tag {
        return Err(RecordError::Malformed {
            position: root.span.start,
            message: format!("expected <{}>, found <{}>", parent_tag, root.name),
        });
    }
    Ok(Record {
        source: text.to_string(),
        root,
    })
}

/// Cut an input stream into the source text of each `<tag>` element.
/// Nested elements with the same name stay inside their outer record.
pub fn split_records<'a>(text: &'a str, tag: &str) -> Result<Vec<&'a str>, RecordError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = false;

    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    loop {
        let offset = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|err| malformed(&reader, err))?;
        let end = reader.buffer_position() as usize;
        match event {
            Event::Start(open) if open.name().as_ref() == tag.as_bytes() => {
                if depth == 0 {
                    start = offset;
                }
                depth += 1;
            }
            Event::End(close) if close.name().as_ref() == tag.as_bytes() && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    records.push(&text[start..end]);
                }
            }
            Event::Empty(open) if open.name().as_ref() == tag.as_bytes() && depth == 0 => {
                records.push(&text[offset..end]);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth > 0 {
        return Err(RecordError::Unclosed {
            name: tag.to_string(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_attributes_and_spans() {
        let text = r#"<Rec id="7"><Name> X &amp; Y </Name><Empty/></Rec>"#;
        let record = parse_record(text, "Rec", TextPolicy::default()).unwrap();
        let root = &record.root;
        assert_eq!(root.attribute("id", false), Some("7"));
        assert_eq!(root.children[0].contents, "X & Y");
        assert_eq!(root.children[0].parent, "Rec");
        assert_eq!(record.text_of(&root.children[1]), "<Empty/>");
        assert_eq!(record.text_of(root), text);
    }

    #[test]
    fn inline_markup_policy() {
        let text = "<Rec><Title>H<sub>2</sub>O</Title></Rec>";
        let kept = parse_record(text, "", TextPolicy::default()).unwrap();
        assert_eq!(kept.root.children[0].contents, "H<sub>2</sub>O");
        assert!(kept.root.children[0].children.is_empty());

        let policy = TextPolicy {
            unescape: true,
            inline_markup: false,
        };
        let stripped = parse_record(text, "", policy).unwrap();
        assert_eq!(stripped.root.children[0].contents, "H2O");
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            parse_record("<A><B></B>", "", TextPolicy::default()),
            Err(RecordError::Unclosed { .. } | RecordError::Malformed { .. })
        ));
        assert_eq!(
            parse_record("<A/><B/>", "", TextPolicy::default()).unwrap_err(),
            RecordError::MultipleRoots
        );
        assert_eq!(
            parse_record("  ", "", TextPolicy::default()).unwrap_err(),
            RecordError::Empty
        );
        assert!(matches!(
            parse_record("<A></B>", "", TextPolicy::default()),
            Err(RecordError::Malformed { .. })
        ));
    }

    #[test]
    fn splits_records_in_order() {
        let text = "<Set><Rec><Id>1</Id></Rec>\n<Rec><Rec>2</Rec></Rec><Rec/></Set>";
        let records = split_records(text, "Rec").unwrap();
        assert_eq!(
            records,
            vec!["<Rec><Id>1</Id></Rec>", "<Rec><Rec>2</Rec></Rec>", "<Rec/>"]
        );
    }
}
