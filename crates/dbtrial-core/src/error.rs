//! Error types for the benchmark harness.

use std::path::PathBuf;

use thiserror::Error;

use crate::series::Phase;

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the orchestrator and batch runner.
#[derive(Debug, Error)]
pub enum Error {
    /// An adapter could not establish or verify a session.
    #[error("connection error ({backend}): {message}")]
    Connection { backend: String, message: String },

    /// A timing series could not be persisted or removed.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Invalid run configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The run was cancelled before the phase completed.
    #[error("{phase} phase for {backend} cancelled")]
    Cancelled { backend: String, phase: Phase },
}

impl Error {
    /// Check whether this error was caused by a failed `connect()`.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}

/// Errors reported by a backend adapter.
///
/// Only `Connection` ever leaves the orchestrator. Every other variant is
/// degraded to a sentinel trial by the trial runner.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Session could not be established or verified.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Query execution failed on the backend.
    #[error("query failed: {0}")]
    Query(String),

    /// The backend returned something that is not a usable timed result.
    #[error("malformed result: {0}")]
    MalformedResult(String),

    /// The adapter cannot run this kind of query.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Errors raised while persisting or reading timing series.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A persisted series file has unexpected content.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },
}
