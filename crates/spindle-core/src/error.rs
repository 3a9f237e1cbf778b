use std::path::PathBuf;

use thiserror::Error;

/// Pool-level errors. Raised synchronously to the caller of the offending
/// operation; task failures never show up here (see `domain::Failure`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("pool is closed: submissions are rejected once shutdown has started")]
    PoolClosed,
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },

    #[error(transparent)]
    Pool(#[from] PoolError),
}
