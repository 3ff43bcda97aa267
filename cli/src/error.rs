use std::path::PathBuf;

use interpreter::LoadError;
use thiserror::Error;
use xtract::document::RecordError;

/// Failures outside query compilation: I/O, configuration, tables, input.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read standard input: {0}")]
    Stdin(#[source] std::io::Error),
    #[error("invalid config '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Table(#[from] LoadError),
    #[error("cannot split input into records: {0}")]
    Input(#[from] RecordError),
    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("cannot write output: {0}")]
    Write(#[source] std::io::Error),
}
