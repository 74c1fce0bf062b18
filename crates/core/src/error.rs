//! Unified error types for metafetch.
//!
//! Cache faults are reported through this type by the storage backends, but
//! `Store` swallows them after logging: a cache is an optimization, never a
//! source of truth.

use tokio_rusqlite::rusqlite;

/// Unified error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid pattern compiled from robots.txt or a stored decision.
    #[error("INVALID_PATTERN: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Filesystem operation on the cache failed.
    #[error("CACHE_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// Cache entry could not be encoded or decoded.
    #[error("CACHE_ERROR: malformed entry: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Storage key escapes the cache namespace.
    #[error("CACHE_ERROR: invalid key: {0}")]
    InvalidKey(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
