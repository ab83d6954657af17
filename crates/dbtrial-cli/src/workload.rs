//! Workload files.
//!
//! A workload declares the backends to benchmark and the logical queries to
//! run against them. Each query carries one variant per backend, since the
//! same question is phrased differently for each engine. A bare variant
//! takes the query-level `params`; a `{"query": ..., "params": ...}` variant
//! carries its own, or none when `params` is left out:
//!
//! ```json
//! {
//!   "backends": [
//!     {"id": "sqlite", "kind": "sqlite", "path": "bench.db"},
//!     {"id": "pg", "kind": "postgres", "url": "postgres://localhost/bench"}
//!   ],
//!   "queries": [
//!     {
//!       "label": "Query 1 - top companies",
//!       "variants": {
//!         "sqlite": "SELECT * FROM company WHERE revenue > :min",
//!         "pg": {
//!           "query": "SELECT * FROM company WHERE revenue > $1",
//!           "params": {"1": 1000}
//!         }
//!       },
//!       "params": {"min": 1000}
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use dbtrial_backends::{BackendAdapter, BackendKind};
use dbtrial_core::{AdapterError, BatchBackend, BenchmarkQuery, Params, QuerySpec};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading or resolving a workload.
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("failed to read workload {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid workload {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid workload: {0}")]
    Invalid(String),

    #[error("backend {id}: {source}")]
    Backend {
        id: String,
        #[source]
        source: AdapterError,
    },
}

/// One backend entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendEntry {
    pub id: String,
    #[serde(flatten)]
    pub kind: BackendKind,
}

/// A variant that carries its own parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantSpec {
    pub query: QuerySpec,
    #[serde(default)]
    pub params: Option<Params>,
}

/// One backend's phrasing of a logical query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Variant {
    /// `{"query": ..., "params": ...}`. Only these two keys are accepted,
    /// so any other object falls through to a structured query.
    Own(VariantSpec),
    /// Query text or structured pipeline using the query-level params.
    Plain(QuerySpec),
}

impl Variant {
    /// Query and parameters for this variant, given the query-level params.
    pub fn resolve(&self, shared: Option<&Params>) -> (QuerySpec, Option<Params>) {
        match self {
            Variant::Own(spec) => (spec.query.clone(), spec.params.clone()),
            Variant::Plain(query) => (query.clone(), shared.cloned()),
        }
    }
}

/// One logical query with its per-backend variants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkloadQuery {
    pub label: String,
    pub variants: BTreeMap<String, Variant>,
    /// Parameters for variants that do not carry their own.
    #[serde(default)]
    pub params: Option<Params>,
}

/// A parsed workload file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Workload {
    pub backends: Vec<BackendEntry>,
    pub queries: Vec<WorkloadQuery>,
}

impl Workload {
    /// Read and validate a workload file.
    pub fn load(path: &Path) -> Result<Self, WorkloadError> {
        let text = std::fs::read_to_string(path).map_err(|source| WorkloadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let workload: Workload =
            serde_json::from_str(&text).map_err(|source| WorkloadError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        workload.validate()?;
        Ok(workload)
    }

    /// Check ids are unique and every variant names a declared backend.
    pub fn validate(&self) -> Result<(), WorkloadError> {
        if self.backends.is_empty() {
            return Err(WorkloadError::Invalid("no backends declared".to_string()));
        }

        let mut ids = HashSet::new();
        for backend in &self.backends {
            if backend.id.is_empty() {
                return Err(WorkloadError::Invalid("empty backend id".to_string()));
            }
            if !ids.insert(backend.id.as_str()) {
                return Err(WorkloadError::Invalid(format!(
                    "duplicate backend id '{}'",
                    backend.id
                )));
            }
        }

        for query in &self.queries {
            for id in query.variants.keys() {
                if !ids.contains(id.as_str()) {
                    return Err(WorkloadError::Invalid(format!(
                        "query '{}' has a variant for unknown backend '{}'",
                        query.label, id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Build the batch, optionally restricted to the backend ids in `only`.
    ///
    /// Query indices are 1-based positions in the workload and stay stable
    /// when a backend has no variant for some query.
    pub fn into_batch(
        self,
        only: &[String],
    ) -> Result<Vec<BatchBackend<BackendAdapter>>, WorkloadError> {
        for id in only {
            if !self.backends.iter().any(|b| &b.id == id) {
                return Err(WorkloadError::Invalid(format!("unknown backend '{}'", id)));
            }
        }

        let mut batch = Vec::new();
        for backend in &self.backends {
            if !only.is_empty() && !only.contains(&backend.id) {
                continue;
            }

            let queries: Vec<BenchmarkQuery> = self
                .queries
                .iter()
                .enumerate()
                .filter_map(|(i, query)| {
                    let variant = query.variants.get(&backend.id)?;
                    let (spec, params) = variant.resolve(query.params.as_ref());
                    Some(BenchmarkQuery {
                        index: i + 1,
                        label: query.label.clone(),
                        spec,
                        params,
                    })
                })
                .collect();

            if queries.is_empty() {
                tracing::warn!(backend = %backend.id, "no queries for backend, skipping");
                continue;
            }

            let adapter =
                BackendAdapter::from_kind(&backend.kind).map_err(|source| WorkloadError::Backend {
                    id: backend.id.clone(),
                    source,
                })?;

            batch.push(BatchBackend {
                id: backend.id.clone(),
                adapter,
                queries,
            });
        }

        Ok(batch)
    }
}
