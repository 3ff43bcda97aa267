use std::collections::HashMap;
use std::fs;
use std::path::Path;

use aho_corasick::{AhoCorasick, MatchKind};

use crate::error::LoadError;

/// Multi-pattern text search used by `-classify`.
///
/// The callback receives the matched pattern, its label, and the byte
/// offset of the match. Returning `false` stops the scan.
pub trait Searcher: Send + Sync {
    fn search(&self, text: &str, callback: &mut dyn FnMut(&str, &str, usize) -> bool);
}

/// Case-insensitive whole-word matcher over a fixed pattern list.
pub struct PatternSearcher {
    automaton: AhoCorasick,
    patterns: Vec<String>,
    labels: Vec<String>,
}

impl PatternSearcher {
    /// Build from `(pattern, label)` pairs. Longer patterns win over their prefixes.
    pub fn new<I, P, L>(entries: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (P, L)>,
        P: Into<String>,
        L: Into<String>,
    {
        let (patterns, labels): (Vec<String>, Vec<String>) = entries
            .into_iter()
            .map(|(pattern, label)| (pattern.into(), label.into()))
            .unzip();
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .map_err(|err| LoadError::Searcher(err.to_string()))?;
        Ok(PatternSearcher {
            automaton,
            patterns,
            labels,
        })
    }

    /// Load a two-column `pattern<TAB>label` file.
    pub fn from_tsv(path: &Path) -> Result<Self, LoadError> {
        let table = read_pairs(path)?;
        PatternSearcher::new(table)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
}

impl Searcher for PatternSearcher {
    fn search(&self, text: &str, callback: &mut dyn FnMut(&str, &str, usize) -> bool) {
        let bytes = text.as_bytes();
        for found in self.automaton.find_iter(text) {
            let before = found.start().checked_sub(1).map(|i| bytes[i]);
            let after = bytes.get(found.end()).copied();
            if before.is_some_and(is_word_byte) || after.is_some_and(is_word_byte) {
                continue;
            }
            let id = found.pattern().as_usize();
            if !callback(&self.patterns[id], &self.labels[id], found.start()) {
                break;
            }
        }
    }
}

fn read_pairs(path: &Path) -> Result<Vec<(String, String)>, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut pairs = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('\t') else {
            return Err(LoadError::Malformed {
                path: path.to_path_buf(),
                line: number + 1,
            });
        };
        pairs.push((key.to_string(), value.trim_end().to_string()));
    }
    Ok(pairs)
}

/// Load a two-column `key<TAB>value` translation table.
pub fn load_translation_table(path: &Path) -> Result<HashMap<String, String>, LoadError> {
    let pairs = read_pairs(path)?;
    tracing::debug!(path = %path.display(), entries = pairs.len(), "loaded translation table");
    Ok(pairs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn collect(searcher: &PatternSearcher, text: &str) -> Vec<(String, String, usize)> {
        let mut found = Vec::new();
        searcher.search(text, &mut |pattern, label, position| {
            found.push((pattern.to_string(), label.to_string(), position));
            true
        });
        found
    }

    #[test]
    fn whole_words_case_insensitive() {
        let searcher =
            PatternSearcher::new([("venom", "TOXIN"), ("snake venom", "TOXIN"), ("rat", "ANIMAL")])
                .unwrap();
        let found = collect(&searcher, "Snake Venom from a pirate rat");
        assert_eq!(
            found,
            vec![
                ("snake venom".to_string(), "TOXIN".to_string(), 0),
                ("rat".to_string(), "ANIMAL".to_string(), 26),
            ]
        );
    }

    #[test]
    fn callback_can_stop_the_scan() {
        let searcher = PatternSearcher::new([("a", "X"), ("b", "Y")]).unwrap();
        let mut seen = 0;
        searcher.search("a b a b", &mut |_, _, _| {
            seen += 1;
            false
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn loads_tab_separated_tables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\nD001\tAspirin\nD002\tCaffeine").unwrap();
        let table = load_translation_table(file.path()).unwrap();
        assert_eq!(table.get("D002").map(String::as_str), Some("Caffeine"));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "no tab here").unwrap();
        assert!(matches!(
            load_translation_table(bad.path()),
            Err(LoadError::Malformed { line: 1, .. })
        ));
    }
}
