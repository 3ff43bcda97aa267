//! Positional term indexes and word streams for search-text preparation.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};
use xtract::operation::Extraction;

use crate::text::{letters_only, plain};

/// Positions skipped between fragments so phrases never span two of them.
const FRAGMENT_GAP: usize = 100;

static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "also", "although",
    "always", "among", "an", "and", "another", "any", "are", "as", "at", "be", "because", "been",
    "before", "being", "between", "both", "but", "by", "can", "could", "did", "do", "does",
    "done", "due", "during", "each", "either", "enough", "especially", "etc", "for", "found",
    "from", "further", "had", "has", "have", "having", "here", "how", "however", "i", "if", "in",
    "into", "is", "it", "its", "itself", "just", "kg", "km", "made", "mainly", "make", "may",
    "mg", "might", "ml", "mm", "most", "mostly", "must", "nearly", "neither", "no", "nor",
    "obtained", "of", "often", "on", "our", "overall", "perhaps", "pmid", "quite", "rather",
    "really", "regarding", "seem", "seen", "several", "should", "show", "showed", "shown",
    "shows", "significantly", "since", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "therefore", "these", "they", "this", "those", "through",
    "thus", "to", "upon", "use", "used", "using", "various", "very", "was", "we", "were", "what",
    "when", "which", "while", "with", "within", "without", "would",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Lowercase alphanumeric words of `text`, markup removed.
pub fn words(text: &str) -> Vec<String> {
    letters_only(&plain(text).to_lowercase(), true)
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn stem(word: &str) -> String {
    STEMMER.stem(word).into_owned()
}

/// The tag an indexing extraction wraps its terms in.
pub fn index_tag(extraction: Extraction) -> Option<&'static str> {
    match extraction {
        Extraction::Indices => Some("TIAB"),
        Extraction::Article => Some("TITL"),
        Extraction::Abstract => Some("ABST"),
        Extraction::Paragraph => Some("PARA"),
        Extraction::Stemmed => Some("STEM"),
        _ => None,
    }
}

/// Build a positional index over the fragments: each distinct term with
/// the 1-based positions it occupies, as `<TAG pos="1,5">term</TAG>`.
///
/// Stop words are left out of the index but still advance the position.
pub fn positional_index(fragments: &[String], tag: &str, stemmed: bool) -> Vec<String> {
    let mut terms: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut position = 0;
    for (number, fragment) in fragments.iter().enumerate() {
        if number > 0 {
            position += FRAGMENT_GAP;
        }
        for word in words(fragment) {
            position += 1;
            if is_stop_word(&word) {
                continue;
            }
            let term = if stemmed { stem(&word) } else { word };
            terms.entry(term).or_default().push(position);
        }
    }
    terms
        .into_iter()
        .map(|(term, positions)| {
            let positions: Vec<String> = positions.iter().map(usize::to_string).collect();
            format!("<{tag} pos=\"{}\">{term}</{tag}>", positions.join(","))
        })
        .collect()
}

/// Adjacent word pairs that do not cross a stop word.
fn pairs(words: &[String]) -> Vec<String> {
    words
        .windows(2)
        .filter(|pair| !is_stop_word(&pair[0]) && !is_stop_word(&pair[1]))
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

/// Split each value into the token stream an extraction asks for.
pub fn word_stream(extraction: Extraction, values: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for value in values {
        match extraction {
            Extraction::Terms => out.extend(value.split_whitespace().map(str::to_string)),
            Extraction::Words => out.extend(words(value)),
            Extraction::Pairs => out.extend(pairs(&words(value))),
            Extraction::Reverse => out.extend(words(value).into_iter().rev()),
            Extraction::Clauses => out.extend(
                value
                    .split(['.', ',', ';', ':', '!', '?'])
                    .map(str::trim)
                    .filter(|clause| !clause.is_empty())
                    .map(str::to_string),
            ),
            Extraction::Letters => out.extend(
                value
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(String::from),
            ),
            _ => {}
        }
    }
    out
}
