use std::collections::HashMap;

use xtract::document::TextPolicy;

use crate::cache::{Histogram, RegexCache};
use crate::search::Searcher;

/// Per-record variable and accumulator table.
#[derive(Debug, Default, Clone)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Variables::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Overwrite `name`.
    pub fn set(&mut self, name: &str, value: String) {
        self.values.insert(name.to_string(), value);
    }

    /// Append to `name`, inserting `separator` when it already has a value.
    pub fn accumulate(&mut self, name: &str, value: &str, separator: &str) {
        match self.values.get_mut(name) {
            Some(existing) if !existing.is_empty() => {
                existing.push_str(separator);
                existing.push_str(value);
            }
            Some(existing) => existing.push_str(value),
            None => {
                self.values.insert(name.to_string(), value.to_string());
            }
        }
    }
}

/// Collaborators shared by every record: lookup tables, the searcher,
/// and the two synchronized caches.
pub struct Context {
    pub translation: HashMap<String, String>,
    pub searcher: Option<Box<dyn Searcher>>,
    pub histogram: Histogram,
    pub regexes: RegexCache,
    pub policy: TextPolicy,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            translation: HashMap::new(),
            searcher: None,
            histogram: Histogram::new(),
            regexes: RegexCache::new(),
            policy: TextPolicy::default(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn with_translation(mut self, table: HashMap<String, String>) -> Self {
        self.translation = table;
        self
    }

    pub fn with_searcher(mut self, searcher: Box<dyn Searcher>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn with_policy(mut self, policy: TextPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Mutable state of one record's walk.
#[derive(Debug)]
pub struct Environment {
    pub variables: Variables,
    /// Pending field separator, written only when more data follows.
    pub tab: String,
    /// Record terminator; the last `-ret` wins.
    pub ret: String,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            variables: Variables::new(),
            tab: String::new(),
            ret: "\n".to_string(),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_overwrite_and_accumulators_append() {
        let mut vars = Variables::new();
        vars.set("PMID", "1".into());
        vars.set("PMID", "2".into());
        assert_eq!(vars.get("PMID"), Some("2"));

        vars.accumulate("ALL", "a", ", ");
        vars.accumulate("ALL", "b", ", ");
        assert_eq!(vars.get("ALL"), Some("a, b"));
        assert!(!vars.contains("NONE"));
    }
}
