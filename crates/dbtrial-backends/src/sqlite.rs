//! SQLite adapter.
//!
//! Each session is a fresh connection to an existing database file, so a
//! cold trial pays for opening the file and building a new page cache.
//! rusqlite is synchronous; queries run on the calling task.

use std::path::{Path, PathBuf};
use std::time::Instant;

use dbtrial_core::{Adapter, AdapterError, Params, QuerySpec, TimedResult};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, ToSql};

use crate::error::BackendError;

/// SQLite backend adapter.
pub struct SqliteAdapter {
    path: PathBuf,
    conn: Option<Connection>,
}

impl SqliteAdapter {
    /// Create an adapter for the database at `path`. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: None,
        }
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether a session is open.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn open(&self) -> Result<Connection, BackendError> {
        // No CREATE flag: a missing database must fail the connect.
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(conn)
    }

    fn execute(conn: &Connection, sql: &str, params: Option<&Params>) -> Result<u64, BackendError> {
        let bound = named_params(params);
        let refs: Vec<(&str, &dyn ToSql)> = bound
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();

        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(refs.as_slice())?;
        let mut count = 0u64;
        while rows.next()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

impl Adapter for SqliteAdapter {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        let conn = self
            .open()
            .map_err(|e| AdapterError::Connection(format!("{}: {}", self.path.display(), e)))?;
        tracing::debug!(path = %self.path.display(), "sqlite session opened");
        self.conn = Some(conn);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                tracing::warn!(path = %self.path.display(), error = %e, "sqlite close failed");
            }
        }
    }

    async fn run_query(
        &mut self,
        query: &QuerySpec,
        params: Option<&Params>,
    ) -> Result<TimedResult, AdapterError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| AdapterError::Connection("sqlite session not open".to_string()))?;
        let sql = query.as_text().ok_or_else(|| {
            AdapterError::Unsupported("sqlite only runs text queries".to_string())
        })?;

        // Timed from prepare until the last row has been stepped.
        let start = Instant::now();
        let rows = Self::execute(conn, sql, params)?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(TimedResult::new(elapsed_ms, rows))
    }
}

/// Convert JSON parameters to SQLite values with `:name` placeholders.
fn named_params(params: Option<&Params>) -> Vec<(String, SqlValue)> {
    let Some(params) = params else {
        return Vec::new();
    };

    params
        .iter()
        .map(|(name, value)| {
            let name = if name.starts_with([':', '@', '$']) {
                name.clone()
            } else {
                format!(":{}", name)
            };
            (name, json_to_sql(value))
        })
        .collect()
}

fn json_to_sql(value: &serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Integer(*b as i64),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
