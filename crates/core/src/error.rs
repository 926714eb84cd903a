//! Unified error types for sqlstore.
//!
//! Messages carry a stable code prefix so callers and logs can match on them.

use std::time::Duration;

use tokio_rusqlite::rusqlite;

/// Unified error type for executors, statements and the task group.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a zero concurrency limit).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A single-row query matched nothing.
    #[error("NO_ROWS: query returned no rows")]
    NoRows,

    /// A column value could not be converted to the requested type.
    #[error("CONVERSION_ERROR: {0}")]
    Conversion(String),

    /// Database operation failed.
    #[error("DATABASE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Connection-level failure the driver reports without a rusqlite error.
    #[error("DATABASE_ERROR: {0}")]
    Driver(String),

    /// The call did not complete within the deadline carried by its context.
    #[error("TIMEOUT: call exceeded {0:?}")]
    Timeout(Duration),

    /// A task spawned on a bounded group panicked or was aborted.
    #[error("TASK_FAILED: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Whether this is the deferred "no matching row" error.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::NoRows)
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            other => Error::Driver(other.to_string()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e.into(),
            other => Error::Database(other),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => Error::NoRows,
            other => Error::Database(tokio_rusqlite::Error::Error(other)),
        }
    }
}
