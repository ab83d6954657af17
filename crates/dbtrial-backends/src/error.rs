//! Backend error types.

use dbtrial_core::AdapterError;
use thiserror::Error;

/// Driver-level errors raised by the concrete adapters.
#[derive(Debug, Error)]
pub enum BackendError {
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL error.
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Invalid query parameters.
    #[error("invalid parameters: {0}")]
    Params(String),
}

/// Errors raised while a session is open are query failures; connect
/// failures are mapped explicitly by each adapter.
impl From<BackendError> for AdapterError {
    fn from(err: BackendError) -> Self {
        AdapterError::Query(err.to_string())
    }
}
