use dashmap::DashMap;
use regex::Regex;

/// Value counts shared across concurrently processed records.
#[derive(Debug, Default)]
pub struct Histogram {
    counts: DashMap<String, usize>,
}

impl Histogram {
    pub fn new() -> Self {
        Histogram::default()
    }

    pub fn record(&self, value: &str) {
        *self.counts.entry(value.to_string()).or_insert(0) += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// All counts, sorted by value.
    pub fn snapshot(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self
            .counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        entries.sort();
        entries
    }
}

/// Compiled `-reg` expressions, keyed by pattern text.
#[derive(Debug, Default)]
pub struct RegexCache {
    entries: DashMap<String, Regex>,
}

impl RegexCache {
    pub fn new() -> Self {
        RegexCache::default()
    }

    /// Return the compiled form of `pattern`, compiling it on first use.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Some(found) = self.entries.get(pattern) {
            return Ok(found.clone());
        }
        let compiled = Regex::new(pattern)?;
        Ok(self
            .entries
            .entry(pattern.to_string())
            .or_insert(compiled)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
