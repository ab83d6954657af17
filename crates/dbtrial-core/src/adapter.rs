//! Backend adapter contract.
//!
//! An adapter owns the driver-specific connection state for one database
//! engine. The harness only ever talks to a backend through this trait, so
//! the orchestrator stays driver-agnostic.
//!
//! # Timing boundary
//!
//! `run_query` must report time spent executing the query and fully
//! materializing its result set. Session acquisition belongs to
//! `connect()` and must not be included. Lazy cursors have to be drained
//! before the timer stops, otherwise lazily and eagerly evaluated APIs are
//! not comparable.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Optional named query parameters.
pub type Params = BTreeMap<String, serde_json::Value>;

/// Backend-specific representation of a logical query.
///
/// Text queries (SQL, Cypher, AQL, ...) and structured pipelines are both
/// opaque to the harness; only the adapter interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuerySpec {
    /// Query text in the backend's native language.
    Text(String),
    /// Structured description, e.g. an aggregation pipeline.
    Structured(serde_json::Value),
}

impl QuerySpec {
    /// Create a text query.
    pub fn text(query: impl Into<String>) -> Self {
        QuerySpec::Text(query.into())
    }

    /// Return the query text, if this is a text query.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            QuerySpec::Text(text) => Some(text),
            QuerySpec::Structured(_) => None,
        }
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySpec::Text(text) => write!(f, "{}", text.trim()),
            QuerySpec::Structured(value) => write!(f, "{}", value),
        }
    }
}

/// Timing envelope produced by one query execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimedResult {
    /// Measured execution time in milliseconds. `None` means the backend
    /// did not report a usable timing.
    pub elapsed_ms: Option<f64>,
    /// Number of rows or documents materialized.
    pub rows: u64,
    /// Backend-reported error message, if any.
    pub error: Option<String>,
}

impl TimedResult {
    /// Create a result with a measured elapsed time.
    pub fn new(elapsed_ms: f64, rows: u64) -> Self {
        Self {
            elapsed_ms: Some(elapsed_ms),
            rows,
            error: None,
        }
    }

    /// Create a result that carries no timing.
    pub fn missing_timing() -> Self {
        Self::default()
    }

    /// Create a result describing a backend-side failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            elapsed_ms: None,
            rows: 0,
            error: Some(message.into()),
        }
    }

    /// Validate the envelope and extract the elapsed time.
    pub fn validate(&self) -> Result<f64, AdapterError> {
        if let Some(error) = &self.error {
            return Err(AdapterError::Query(error.clone()));
        }
        match self.elapsed_ms {
            None => Err(AdapterError::MalformedResult(
                "elapsed_ms is missing".to_string(),
            )),
            Some(ms) if !ms.is_finite() => Err(AdapterError::MalformedResult(format!(
                "elapsed_ms is not finite: {}",
                ms
            ))),
            Some(ms) if ms < 0.0 => Err(AdapterError::MalformedResult(format!(
                "elapsed_ms is negative: {}",
                ms
            ))),
            Some(ms) => Ok(ms),
        }
    }
}

/// A pluggable backend adapter.
///
/// Implementations hold at most one live session at a time.
pub trait Adapter: Send {
    /// Establish a session and verify it is usable.
    ///
    /// Must fail with [`AdapterError::Connection`] rather than proceed with
    /// an unusable handle.
    fn connect(&mut self) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Release all session resources. Safe to call when no session is open.
    fn close(&mut self);

    /// Execute the query exactly once over the open session.
    fn run_query(
        &mut self,
        query: &QuerySpec,
        params: Option<&Params>,
    ) -> impl Future<Output = Result<TimedResult, AdapterError>> + Send;
}

/// An open adapter session.
///
/// Dropping the session closes it, so the connection is released on every
/// exit path including errors, panics and a dropped orchestration future.
pub struct Session<'a, A: Adapter> {
    adapter: &'a mut A,
    open: bool,
}

impl<'a, A: Adapter> Session<'a, A> {
    /// Connect the adapter and wrap it in a session.
    ///
    /// A failed connect is followed by `close()` so that partially acquired
    /// resources are released.
    pub async fn open(adapter: &'a mut A) -> Result<Session<'a, A>, AdapterError> {
        if let Err(e) = adapter.connect().await {
            adapter.close();
            return Err(e);
        }
        Ok(Self {
            adapter,
            open: true,
        })
    }

    /// Access the connected adapter.
    pub fn adapter(&mut self) -> &mut A {
        self.adapter
    }

    /// Close the session explicitly.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.adapter.close();
        }
    }
}

impl<A: Adapter> Drop for Session<'_, A> {
    fn drop(&mut self) {
        self.release();
    }
}
