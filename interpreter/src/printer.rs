use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use xtract::document::{Node, is_inline};
use xtract::operation::step::Dump;

/// Serialize `node` on a single line in the requested notation.
pub fn dump(node: &Node, style: Dump) -> String {
    match style {
        Dump::Bracket => bracket(node),
        Dump::Json => json(node),
        Dump::Xml(4) => text_only(node),
        Dump::Xml(level) => {
            let mut out = String::new();
            xml(node, level >= 2, level >= 3, &mut out);
            out
        }
    }
}

/// `Name[text Child[...] ...]`
fn bracket(node: &Node) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !node.contents.is_empty() {
        parts.push(node.contents.clone());
    }
    parts.extend(node.children.iter().map(bracket));
    format!("{}[{}]", node.name, parts.join(" "))
}

fn json_value(node: &Node) -> Value {
    if node.attributes.is_empty() && node.children.is_empty() {
        return Value::String(node.contents.clone());
    }
    let mut object = Map::new();
    for (key, value) in &node.attributes {
        object.insert(format!("@{}", key), Value::String(value.clone()));
    }
    if !node.contents.is_empty() {
        object.insert("#text".to_string(), Value::String(node.contents.clone()));
    }
    for child in &node.children {
        let value = json_value(child);
        match object.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                object.insert(child.name.clone(), value);
            }
        }
    }
    Value::Object(object)
}

fn json(node: &Node) -> String {
    let mut top = Map::new();
    top.insert(node.name.clone(), json_value(node));
    Value::Object(top).to_string()
}

fn is_blank(node: &Node) -> bool {
    node.contents.is_empty() && node.children.iter().all(is_blank)
}

fn xml(node: &Node, drop_attributes: bool, drop_empty: bool, out: &mut String) {
    if drop_empty && is_blank(node) {
        return;
    }
    out.push('<');
    out.push_str(&node.name);
    if !drop_attributes {
        for (key, value) in &node.attributes {
            out.push_str(&format!(" {}=\"{}\"", key, quick_xml::escape::escape(value)));
        }
    }
    if node.contents.is_empty() && node.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    escape_text(&node.contents, out);
    for child in &node.children {
        xml(child, drop_attributes, drop_empty, out);
    }
    out.push_str("</");
    out.push_str(&node.name);
    out.push('>');
}

static INLINE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</?([A-Za-z][\w.-]*)[^<>]*>").expect("valid regex"));
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(#[0-9]+|#x[0-9A-Fa-f]+|[A-Za-z][A-Za-z0-9]*);").expect("valid regex")
});

/// Escape element text. Retained inline tags and entity references that
/// survived an unescaped read pass through unchanged.
fn escape_text(text: &str, out: &mut String) {
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        let mut width = c.len_utf8();
        match c {
            '<' => match INLINE_TAG.captures(rest) {
                Some(tag) if is_inline(&tag[1]) => {
                    width = tag[0].len();
                    out.push_str(&tag[0]);
                }
                _ => out.push_str("&lt;"),
            },
            '>' => out.push_str("&gt;"),
            '&' if ENTITY.is_match(rest) => out.push('&'),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
        rest = &rest[width..];
    }
}

fn text_only(node: &Node) -> String {
    let mut words: Vec<&str> = Vec::new();
    collect_text(node, &mut words);
    words.join(" ")
}

fn collect_text<'a>(node: &'a Node, words: &mut Vec<&'a str>) {
    if !node.contents.is_empty() {
        words.push(&node.contents);
    }
    for child in &node.children {
        collect_text(child, words);
    }
}
