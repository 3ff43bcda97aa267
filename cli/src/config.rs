use std::path::{Path, PathBuf};

use serde::Deserialize;
use xtract::document::TextPolicy;

use crate::error::CliError;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "xtract.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Printed once before the first record.
    pub head: Option<String>,
    /// Printed once after the last record.
    pub tail: Option<String>,
    /// Printed before each record that produced output.
    pub hd: Option<String>,
    /// Printed after each record that produced output.
    pub tl: Option<String>,
    /// Worker threads; 0 or absent uses one per core.
    pub jobs: Option<usize>,
    /// Two-column TSV for `-translate`.
    pub translate: Option<PathBuf>,
    /// Two-column TSV of `pattern<TAB>label` for `-classify`.
    pub patterns: Option<PathBuf>,
    pub text: TextConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub unescape: bool,
    pub inline_markup: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        let policy = TextPolicy::default();
        TextConfig {
            unescape: policy.unescape,
            inline_markup: policy.inline_markup,
        }
    }
}

impl Config {
    pub fn parse(text: &str, path: &Path) -> Result<Config, CliError> {
        let mut config: Config = toml::from_str(text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        // table paths are relative to the config file
        if let Some(base) = path.parent() {
            config.translate = config.translate.map(|table| base.join(table));
            config.patterns = config.patterns.map(|table| base.join(table));
        }
        Ok(config)
    }

    /// Read `explicit`, or `xtract.toml` in the working directory if it
    /// exists. Only an explicit path is required to exist.
    pub fn load(explicit: Option<&Path>) -> Result<Config, CliError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG);
                if !fallback.is_file() {
                    return Ok(Config::default());
                }
                fallback
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| CliError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Config::parse(&text, &path)
    }

    pub fn policy(&self) -> TextPolicy {
        TextPolicy {
            unescape: self.text.unescape,
            inline_markup: self.text.inline_markup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("", Path::new("xtract.toml")).unwrap();
        assert!(config.head.is_none());
        assert_eq!(config.policy(), TextPolicy::default());
    }

    #[test]
    fn table_paths_resolve_against_the_config_directory() {
        let text = r#"
            head = "<Set>"
            jobs = 2
            translate = "codes.tsv"

            [text]
            inline_markup = false
        "#;
        let config = Config::parse(text, Path::new("conf/xtract.toml")).unwrap();
        assert_eq!(config.head.as_deref(), Some("<Set>"));
        assert_eq!(config.jobs, Some(2));
        assert_eq!(config.translate, Some(PathBuf::from("conf/codes.tsv")));
        assert!(config.text.unescape);
        assert!(!config.text.inline_markup);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse("heads = 1", Path::new("xtract.toml")).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(CliError::Read { .. })
        ));

        let present = dir.path().join("xtract.toml");
        std::fs::write(&present, "tail = \"</Set>\"\n").unwrap();
        let config = Config::load(Some(&present)).unwrap();
        assert_eq!(config.tail.as_deref(), Some("</Set>"));
    }
}
