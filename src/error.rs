use std::path::PathBuf;

use thiserror::Error;

/// Errors raised outside the tree core: configuration, logging and host I/O.
///
/// Tree operations themselves never fail loudly; they report rejection
/// through their return values.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
