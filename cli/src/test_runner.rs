use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use xtract::parser::Parser;

use crate::config::Config;
use crate::driver::{self, Overrides, Settings};

const FIXTURE_SUFFIX: &str = ".test.xml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// The query, one token per entry, starting at `-pattern`.
    pub args: Vec<String>,

    /// Expected exact stdout output (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// If true, the query is expected not to compile.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// Substring the compile error message must contain.
    #[serde(default)]
    pub error_contains: Option<String>,

    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub tail: Option<String>,
    #[serde(default)]
    pub hd: Option<String>,
    #[serde(default)]
    pub tl: Option<String>,
}

/// Split a `.test.xml` file into its TOML front matter and XML input.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let input = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, input))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|name| name.strip_suffix(FIXTURE_SUFFIX))
                .unwrap_or("?")
        })
    }
}

/// Compile and run one fixture; `None` when it behaves as expected.
fn check_fixture(config: &TestConfig, input: &str) -> Option<String> {
    let parse_result = Parser::new(&config.args, 0).parse();

    if config.expect_parse_error {
        return match parse_result {
            Ok(_) => Some("expected parse error, but compiling succeeded".into()),
            Err(err) => match &config.error_contains {
                Some(expected) if !err.message.contains(expected.as_str()) => Some(format!(
                    "expected parse error containing \"{}\", got: {}",
                    expected, err.message
                )),
                _ => None,
            },
        };
    }

    let query = match parse_result {
        Ok(query) => query,
        Err(err) => return Some(format!("unexpected parse error: {}", err.message)),
    };

    let settings = Settings::resolve(
        Config::default(),
        Overrides {
            head: config.head.clone(),
            tail: config.tail.clone(),
            hd: config.hd.clone(),
            tl: config.tl.clone(),
            jobs: Some(1),
            ..Overrides::default()
        },
    );
    let actual = match settings
        .context()
        .and_then(|ctx| driver::run(&query, input, &ctx, &settings))
    {
        Ok(actual) => actual,
        Err(err) => return Some(format!("run failed: {}", err)),
    };

    let expected = config.expect_output.as_deref()?;
    let actual_trimmed = actual.trim();
    let expected_trimmed = expected.trim();
    if actual_trimmed == expected_trimmed {
        None
    } else {
        Some(format!(
            "output mismatch\n  expected: {}\n  actual:   {}",
            expected_trimmed.replace('\n', "\n            "),
            actual_trimmed.replace('\n', "\n            ")
        ))
    }
}

pub fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    let (config, input) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("frontmatter error: {}", e)),
            };
        }
    };

    TestResult {
        path: path.to_path_buf(),
        description: config.description.clone(),
        outcome: match check_fixture(&config, input) {
            None => TestOutcome::Pass,
            Some(reason) => TestOutcome::Fail(reason),
        },
    }
}

/// Discover fixtures grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(FIXTURE_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

/// Select the categories to run; an empty request selects all of them.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }
    let mut filtered = BTreeMap::new();
    for request in requested {
        let req = request.trim_matches('/');
        let mut found = false;
        for (cat, files) in all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.as_str(), files);
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

/// Run every fixture under `path` (or a single file).
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let all_categories = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };

    if all_categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return 1;
    }

    let run_categories = select_categories(&all_categories, categories);
    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { *cat };
            eprintln!();
            eprintln!("{}", bold(header, no_color));
        }

        for file in *files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    let failed = failures.len();
    eprintln!();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let bad = if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            bad,
            passed,
            failed,
            passed + failed
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    #[test]
    fn bundled_fixtures_pass() {
        let all = discover_categorized(&fixtures());
        assert!(!all.is_empty());
        for file in all.values().flatten() {
            let result = run_single_test(file);
            if let TestOutcome::Fail(reason) = &result.outcome {
                panic!("{}: {}", file.display(), reason);
            }
        }
    }

    #[test]
    fn fixtures_are_grouped_by_folder() {
        let all = discover_categorized(&fixtures());
        assert!(all.contains_key("conditions"));
        assert!(all.contains_key("extraction"));
        assert!(all.contains_key("errors"));
    }

    #[test]
    fn front_matter_is_required() {
        assert!(parse_test_file("<Rec/>").is_err());
        assert!(parse_test_file("---\nargs = []\n<Rec/>").is_err());
        let (config, input) =
            parse_test_file("---\nargs = [\"-pattern\", \"Rec\"]\n---\n<Rec/>\n").unwrap();
        assert_eq!(config.args, vec!["-pattern", "Rec"]);
        assert_eq!(input, "<Rec/>\n");
    }

    #[test]
    fn mismatches_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wrong.test.xml");
        std::fs::write(
            &file,
            "---\nargs = [\"-pattern\", \"Rec\", \"-element\", \"Id\"]\nexpect_output = \"2\"\n---\n\
             <Set><Rec><Id>1</Id></Rec></Set>\n",
        )
        .unwrap();
        let result = run_single_test(&file);
        assert_eq!(result.label(), "wrong");
        assert!(matches!(&result.outcome, TestOutcome::Fail(reason) if reason.contains("output mismatch")));
        assert_eq!(run_tests(&file, true, &[]), 1);
    }
}
