//! SQLite store error types.

use promotion_core::StoreError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised inside the SQLite store.
///
/// They are converted into `promotion_core::StoreError` at the trait boundary;
/// everything except an embedded `StoreError` becomes `StoreError::Backend`.
#[derive(Error, Debug)]
pub enum SqliteStoreError {
    #[error("SQLite failure: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode or decode a stored promotion request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database lock failed: {0}")]
    Lock(String),

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SqliteStoreError> for StoreError {
    fn from(err: SqliteStoreError) -> Self {
        match err {
            SqliteStoreError::Store(inner) => inner,
            other => StoreError::Backend {
                message: other.to_string(),
            },
        }
    }
}

pub type SqliteResult<T> = Result<T, SqliteStoreError>;
