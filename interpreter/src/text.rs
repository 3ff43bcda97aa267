//! String transforms applied value by value.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").expect("valid regex"));
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#x[0-9A-Fa-f]+|[A-Za-z]+);").expect("valid regex"));
static DOI_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(doi:\s*|https?://(dx\.)?doi\.org/)").expect("valid regex"));

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn compress(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn strip_markup(text: &str) -> String {
    TAG.replace_all(text, "").into_owned()
}

pub fn encode(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Resolve entity references; text with unknown entities is returned as is.
pub fn decode(text: &str) -> String {
    quick_xml::escape::unescape(text)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| text.to_string())
}

/// Spaces become underscores.
pub fn chain(text: &str) -> String {
    compress(text).replace(' ', "_")
}

pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn mirror(text: &str) -> String {
    text.chars().rev().collect()
}

/// Keep letters (and digits with `keep_digits`); everything else separates words.
pub fn letters_only(text: &str, keep_digits: bool) -> String {
    let kept: String = text
        .chars()
        .map(|c| {
            if c.is_alphabetic() || (keep_digits && c.is_numeric()) {
                c
            } else {
                ' '
            }
        })
        .collect();
    compress(&kept)
}

/// Markup removed, whitespace compressed.
pub fn plain(text: &str) -> String {
    compress(&strip_markup(text))
}

/// Surrounding whitespace and leading zeros of a number removed.
pub fn trim(text: &str) -> String {
    let mut trimmed = text.trim();
    while trimmed.len() > 1
        && trimmed.starts_with('0')
        && trimmed[1..].starts_with(|c: char| c.is_ascii_digit())
    {
        trimmed = &trimmed[1..];
    }
    trimmed.to_string()
}

fn ascii_fold(c: char) -> Option<&'static str> {
    let folded = match c {
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ø' => "o",
        'Ø' => "O",
        'đ' | 'ð' => "d",
        'Đ' | 'Ð' => "D",
        'ł' => "l",
        'Ł' => "L",
        'þ' => "th",
        'Þ' => "TH",
        'ı' => "i",
        '‘' | '’' => "'",
        '“' | '”' => "\"",
        '–' | '—' => "-",
        'α' => "alpha",
        'β' => "beta",
        'γ' => "gamma",
        'δ' => "delta",
        'κ' => "kappa",
        'µ' | 'μ' => "mu",
        _ => return None,
    };
    Some(folded)
}

/// Reduce to ASCII: accents dropped, common ligatures and Greek letters spelled out.
pub fn basic(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii() {
            out.push(c);
        } else if let Some(folded) = ascii_fold(c) {
            out.push_str(folded);
        } else if c.is_whitespace() {
            out.push(' ');
        }
    }
    out
}

/// Words rearranged in alphabetical order, ignoring case.
pub fn order(text: &str) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    words.sort_by_key(|word| word.to_lowercase());
    words.join(" ")
}

pub fn word_count(text: &str) -> usize {
    letters_only(&strip_markup(text), true).split_whitespace().count()
}

/// A DOI as a resolvable URL.
pub fn doi(text: &str) -> Option<String> {
    let bare = DOI_PREFIX.replace(text.trim(), "");
    if !bare.starts_with("10.") {
        return None;
    }
    Some(format!("https://doi.org/{}", bare))
}

/// Data-quality markers for `-test`: non-ASCII characters, embedded markup,
/// irregular spacing.
pub fn quality_markers(text: &str) -> Vec<&'static str> {
    let mut markers = Vec::new();
    if !text.is_ascii() {
        markers.push("UNICODE");
    }
    if TAG.is_match(text) || ENTITY.is_match(text) {
        markers.push("MARKUP");
    }
    if text != text.trim()
        || text.contains("  ")
        || text.contains(['\t', '\n', '\r'])
    {
        markers.push("SPACING");
    }
    markers
}

/// Distinct non-ASCII characters for `-scan`, as `U+XXXX c`.
pub fn scan_characters<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let found: BTreeSet<char> = values
        .into_iter()
        .flat_map(str::chars)
        .filter(|c| !c.is_ascii())
        .collect();
    found
        .into_iter()
        .map(|c| format!("U+{:04X} {}", c as u32, c))
        .collect()
}
