use std::path::PathBuf;

use thiserror::Error;

/// Failures loading a lookup table or pattern list.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: expected two tab-separated columns")]
    Malformed { path: PathBuf, line: usize },
    #[error("cannot build pattern searcher: {0}")]
    Searcher(String),
}
