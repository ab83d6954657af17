//! Sequential benchmarking of many (backend, query) pairs.
//!
//! Pairs are never interleaved: every backend runs all of its queries
//! before the next backend starts, and each pair runs to completion before
//! the next one begins.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::{Adapter, Params, QuerySpec};
use crate::cancel::pause;
use crate::config::RunDescriptor;
use crate::error::{Error, Result};
use crate::orchestrator::{Orchestrator, RunReport};
use crate::series::Phase;
use crate::sink::ResultSink;

/// Default pause between two pairs.
pub const DEFAULT_PAIR_PAUSE: Duration = Duration::from_secs(2);

/// What to do when a pair fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairFailurePolicy {
    /// Stop the batch and return the error.
    #[default]
    Abort,
    /// Record the failure and move on to the next pair.
    Continue,
}

impl fmt::Display for PairFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairFailurePolicy::Abort => write!(f, "abort"),
            PairFailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

impl FromStr for PairFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(PairFailurePolicy::Abort),
            "continue" => Ok(PairFailurePolicy::Continue),
            other => Err(Error::Config(format!(
                "unknown pair failure policy '{}'",
                other
            ))),
        }
    }
}

/// Batch settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Iteration counts, pause and connect policy applied to every pair.
    /// Backend id, query label and output prefix are filled in per pair.
    pub template: RunDescriptor,

    /// Pause between consecutive pairs.
    pub pair_pause: Duration,

    /// Behavior when a pair fails.
    pub on_failure: PairFailurePolicy,

    /// Remove the series a failing pair already persisted. Series of
    /// earlier, completed pairs are never touched.
    pub remove_partial: bool,
}

impl BatchConfig {
    pub fn new(template: RunDescriptor) -> Self {
        Self {
            template,
            pair_pause: DEFAULT_PAIR_PAUSE,
            on_failure: PairFailurePolicy::default(),
            remove_partial: false,
        }
    }

    pub fn with_pair_pause(mut self, pause: Duration) -> Self {
        self.pair_pause = pause;
        self
    }

    pub fn with_on_failure(mut self, policy: PairFailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn with_remove_partial(mut self, remove: bool) -> Self {
        self.remove_partial = remove;
        self
    }

    /// Descriptor for query number `index` (1-based) on `backend_id`.
    ///
    /// The output prefix is `{backend_id}_query{index}`.
    pub fn descriptor(&self, backend_id: &str, index: usize, label: &str) -> RunDescriptor {
        let mut desc = self.template.clone();
        desc.backend_id = backend_id.to_string();
        desc.query_label = label.to_string();
        desc.output_prefix = format!("{}_query{}", backend_id, index);
        desc
    }
}

/// One query as seen by one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkQuery {
    /// 1-based position of the logical query in the workload.
    pub index: usize,
    pub label: String,
    pub spec: QuerySpec,
    pub params: Option<Params>,
}

/// A backend and the queries to run against it.
pub struct BatchBackend<A> {
    pub id: String,
    pub adapter: A,
    pub queries: Vec<BenchmarkQuery>,
}

/// A pair that did not complete.
#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub backend_id: String,
    pub query_label: String,
    pub error: String,
}

/// Result of a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub completed: Vec<RunReport>,
    pub failures: Vec<PairFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs a batch of pairs through one orchestrator.
pub struct BatchRunner<S> {
    orchestrator: Orchestrator<S>,
    config: BatchConfig,
}

impl<S: ResultSink> BatchRunner<S> {
    pub fn new(orchestrator: Orchestrator<S>, config: BatchConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn into_orchestrator(self) -> Orchestrator<S> {
        self.orchestrator
    }

    /// Run every query of every backend, in order.
    ///
    /// With [`PairFailurePolicy::Abort`] the first failure is returned as an
    /// error. Cancellation always stops the batch.
    pub async fn run<A: Adapter>(&mut self, backends: &mut [BatchBackend<A>]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let mut first = true;

        for backend in backends.iter_mut() {
            for query in &backend.queries {
                if !first {
                    self.pause_between_pairs(&backend.id).await?;
                }
                first = false;

                let desc = self.config.descriptor(&backend.id, query.index, &query.label);
                let result = self
                    .orchestrator
                    .run(&desc, &mut backend.adapter, &query.spec, query.params.as_ref())
                    .await;

                match result {
                    Ok(run) => report.completed.push(run),
                    Err(e) => {
                        if self.config.remove_partial {
                            self.remove_partial();
                        }
                        if matches!(e, Error::Cancelled { .. })
                            || self.config.on_failure == PairFailurePolicy::Abort
                        {
                            return Err(e);
                        }

                        tracing::warn!(
                            backend = %desc.backend_id,
                            query = %desc.query_label,
                            error = %e,
                            "pair failed, continuing"
                        );
                        report.failures.push(PairFailure {
                            backend_id: desc.backend_id.clone(),
                            query_label: desc.query_label.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            completed = report.completed.len(),
            failed = report.failures.len(),
            "batch complete"
        );
        Ok(report)
    }

    /// Remove the series the failed pair wrote before it failed. Series
    /// it never reached, such as files left by an earlier process, stay.
    fn remove_partial(&mut self) {
        let written = self.orchestrator.persisted().to_vec();
        for name in written {
            match self.orchestrator.sink_mut().remove(&name) {
                Ok(()) => tracing::info!(series = %name, "removed partial series"),
                Err(e) => tracing::warn!(series = %name, error = %e, "failed to remove partial series"),
            }
        }
    }

    async fn pause_between_pairs(&mut self, backend_id: &str) -> Result<()> {
        if pause(self.config.pair_pause, self.orchestrator.cancel_signal_mut()).await {
            Ok(())
        } else {
            Err(Error::Cancelled {
                backend: backend_id.to_string(),
                phase: Phase::Cold,
            })
        }
    }
}
