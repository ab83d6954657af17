//! Concrete database adapters for the dbtrial harness.
//!
//! - [`SqliteAdapter`]: always available, backed by rusqlite.
//! - [`PostgresAdapter`]: backed by sqlx, enable with `--features postgres`.
//!
//! [`BackendAdapter`] wraps whichever adapters were compiled in so that a
//! single batch can mix backends.

pub mod error;
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

use std::path::PathBuf;

use dbtrial_core::{Adapter, AdapterError, Params, QuerySpec, TimedResult};
use serde::Deserialize;

pub use error::BackendError;
pub use sqlite::SqliteAdapter;

#[cfg(feature = "postgres")]
pub use postgres::PostgresAdapter;

/// Connection settings for one backend, as written in a workload file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite database file.
    Sqlite { path: PathBuf },
    /// PostgreSQL connection URL.
    Postgres { url: String },
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Sqlite { .. } => "sqlite",
            BackendKind::Postgres { .. } => "postgres",
        }
    }
}

/// Any adapter compiled into this crate.
pub enum BackendAdapter {
    Sqlite(SqliteAdapter),
    #[cfg(feature = "postgres")]
    Postgres(PostgresAdapter),
}

impl BackendAdapter {
    /// Build an adapter for `kind`.
    ///
    /// Fails with [`AdapterError::Unsupported`] for backends that were not
    /// compiled in.
    pub fn from_kind(kind: &BackendKind) -> Result<Self, AdapterError> {
        match kind {
            BackendKind::Sqlite { path } => Ok(BackendAdapter::Sqlite(SqliteAdapter::new(path))),
            #[cfg(feature = "postgres")]
            BackendKind::Postgres { url } => {
                Ok(BackendAdapter::Postgres(PostgresAdapter::new(url.clone())))
            }
            #[cfg(not(feature = "postgres"))]
            BackendKind::Postgres { .. } => Err(AdapterError::Unsupported(
                "postgres support not compiled in (enable the 'postgres' feature)".to_string(),
            )),
        }
    }
}

impl Adapter for BackendAdapter {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        match self {
            BackendAdapter::Sqlite(adapter) => adapter.connect().await,
            #[cfg(feature = "postgres")]
            BackendAdapter::Postgres(adapter) => adapter.connect().await,
        }
    }

    fn close(&mut self) {
        match self {
            BackendAdapter::Sqlite(adapter) => adapter.close(),
            #[cfg(feature = "postgres")]
            BackendAdapter::Postgres(adapter) => adapter.close(),
        }
    }

    async fn run_query(
        &mut self,
        query: &QuerySpec,
        params: Option<&Params>,
    ) -> Result<TimedResult, AdapterError> {
        match self {
            BackendAdapter::Sqlite(adapter) => adapter.run_query(query, params).await,
            #[cfg(feature = "postgres")]
            BackendAdapter::Postgres(adapter) => adapter.run_query(query, params).await,
        }
    }
}
