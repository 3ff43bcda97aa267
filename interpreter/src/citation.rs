//! Date, author, and journal normalization for bibliographic records.

use once_cell::sync::Lazy;
use regex::Regex;
use xtract::document::{Node, children_named};

use crate::text::compress;

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(1[5-9]|20)\d\d\b").expect("valid regex"));

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "of", "on", "or", "the", "to",
    "with",
];

pub fn year(text: &str) -> Option<String> {
    YEAR.find(text).map(|found| found.as_str().to_string())
}

/// Month number (1-12) from a name, abbreviation, or number.
pub fn month_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Ok(number) = text.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| word.len() >= 3)
        .find_map(|word| MONTHS.iter().position(|m| word.starts_with(m)))
        .map(|index| index as u32 + 1)
}

pub fn month(text: &str) -> Option<String> {
    month_number(text).map(|number| number.to_string())
}

fn join_date(year: &str, month: Option<u32>, day: Option<u32>) -> String {
    let mut out = year.to_string();
    if let Some(month) = month {
        out.push_str(&format!("/{:02}", month));
        if let Some(day) = day {
            out.push_str(&format!("/{:02}", day));
        }
    }
    out
}

fn child_text<'a>(node: &'a Node, name: &str) -> Option<&'a str> {
    children_named(node, name, false)
        .first()
        .map(|child| child.contents.as_str())
        .filter(|text| !text.is_empty())
}

/// `YYYY`, `YYYYMM`, or `YYYYMMDD`, optionally with `-` or `/` separators.
fn compact_date(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|c| !matches!(c, '-' | '/')).collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let part = |range: std::ops::Range<usize>| digits[range].parse::<u32>().ok();
    match digits.len() {
        4 => Some(digits),
        6 => Some(join_date(&digits[..4], part(4..6), None)),
        8 => Some(join_date(&digits[..4], part(4..6), part(6..8))),
        _ => None,
    }
}

/// Normalized `YYYY/MM/DD` date of a date element. Recognizes a
/// `Year`/`Month`/`Day` triplet, a free-text `MedlineDate`, and compact
/// numeric dates.
pub fn date(node: &Node) -> Option<String> {
    if let Some(year) = child_text(node, "Year") {
        let month = child_text(node, "Month").and_then(month_number);
        let day = child_text(node, "Day").and_then(|d| d.trim().parse::<u32>().ok());
        return Some(join_date(year.trim(), month, day));
    }
    let text = child_text(node, "MedlineDate").unwrap_or(node.contents.as_str());
    if text.is_empty() {
        return None;
    }
    if let Some(compact) = compact_date(text.trim()) {
        return Some(compact);
    }
    let year = year(text)?;
    let month = text
        .split_whitespace()
        .find_map(month_number)
        .filter(|_| !text.trim().chars().all(|c| c.is_ascii_digit()));
    Some(join_date(&year, month, None))
}

/// First letters of given names: `John Adam` becomes `JA`.
pub fn initials(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '.' || c == '-')
        .filter_map(|part| part.chars().find(|c| c.is_alphabetic()))
        .flat_map(char::to_uppercase)
        .collect()
}

/// `Last, First Middle` becomes `Last FM`; other forms are compressed.
pub fn author(text: &str) -> String {
    match text.split_once(',') {
        Some((last, first)) if !first.trim().is_empty() => {
            format!("{} {}", compress(last), initials(first))
        }
        Some((last, _)) => compress(last),
        None => compress(text),
    }
}

/// Journal title reduced for matching: lowercase, punctuation removed,
/// leading article dropped.
pub fn journal(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let cleaned = compress(&cleaned);
    cleaned
        .strip_prefix("the ")
        .map(str::to_string)
        .unwrap_or(cleaned)
}

/// Proper-name capitalization with minor words kept lowercase.
pub fn proper(text: &str) -> String {
    compress(text)
        .split(' ')
        .enumerate()
        .map(|(position, word)| {
            let lower = word.to_lowercase();
            if position > 0 && MINOR_WORDS.contains(&lower.as_str()) {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First page of a page range.
pub fn first_page(text: &str) -> Option<String> {
    let first = text
        .split(['-', ',', ';'])
        .next()
        .map(str::trim)
        .unwrap_or("");
    (!first.is_empty()).then(|| first.to_string())
}
