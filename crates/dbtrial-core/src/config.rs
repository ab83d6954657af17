//! Run configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::series::{Phase, SeriesName};

/// Default number of cold trials. The extra trial lets consumers drop a
/// first-call outlier and still have 30 samples.
pub const DEFAULT_COLD_ITERATIONS: usize = 31;

/// Default number of warm trials.
pub const DEFAULT_WARM_ITERATIONS: usize = 30;

/// Default pause between consecutive trials.
pub const DEFAULT_INTER_TRIAL_PAUSE: Duration = Duration::from_millis(200);

/// Default output prefix.
pub const DEFAULT_OUTPUT_PREFIX: &str = "query";

/// What to do when `connect()` fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectFailurePolicy {
    /// Abort the run with a connection error. Nothing is persisted for the
    /// failing phase.
    #[default]
    Abort,
    /// Record sentinel trials in place of the ones that could not connect
    /// and keep going.
    Sentinel,
}

impl fmt::Display for ConnectFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectFailurePolicy::Abort => write!(f, "abort"),
            ConnectFailurePolicy::Sentinel => write!(f, "sentinel"),
        }
    }
}

impl FromStr for ConnectFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(ConnectFailurePolicy::Abort),
            "sentinel" => Ok(ConnectFailurePolicy::Sentinel),
            other => Err(Error::Config(format!(
                "unknown connect failure policy '{}'",
                other
            ))),
        }
    }
}

/// Describes one benchmark run for a (backend, query) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDescriptor {
    /// Backend identifier, used in series names.
    pub backend_id: String,

    /// Human-readable query label, used in diagnostics.
    pub query_label: String,

    /// Number of cold trials.
    pub cold_iterations: usize,

    /// Number of warm trials.
    pub warm_iterations: usize,

    /// Prefix of persisted series names.
    pub output_prefix: String,

    /// Pause after every trial.
    pub inter_trial_pause: Duration,

    /// Behavior when a session cannot be established.
    pub connect_failure: ConnectFailurePolicy,
}

impl RunDescriptor {
    /// Create a descriptor with default iteration counts and pause.
    pub fn new(backend_id: impl Into<String>, query_label: impl Into<String>) -> Self {
        Self {
            backend_id: backend_id.into(),
            query_label: query_label.into(),
            cold_iterations: DEFAULT_COLD_ITERATIONS,
            warm_iterations: DEFAULT_WARM_ITERATIONS,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            inter_trial_pause: DEFAULT_INTER_TRIAL_PAUSE,
            connect_failure: ConnectFailurePolicy::default(),
        }
    }

    /// Set the number of cold trials.
    pub fn with_cold_iterations(mut self, iterations: usize) -> Self {
        self.cold_iterations = iterations;
        self
    }

    /// Set the number of warm trials.
    pub fn with_warm_iterations(mut self, iterations: usize) -> Self {
        self.warm_iterations = iterations;
        self
    }

    /// Set the output prefix.
    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    /// Set the pause between trials.
    pub fn with_inter_trial_pause(mut self, pause: Duration) -> Self {
        self.inter_trial_pause = pause;
        self
    }

    /// Set the connect failure policy.
    pub fn with_connect_failure(mut self, policy: ConnectFailurePolicy) -> Self {
        self.connect_failure = policy;
        self
    }

    /// Number of trials configured for `phase`.
    pub fn iterations(&self, phase: Phase) -> usize {
        match phase {
            Phase::Cold => self.cold_iterations,
            Phase::Warm => self.warm_iterations,
        }
    }

    /// Deterministic series name for `phase`.
    pub fn series_name(&self, phase: Phase) -> SeriesName {
        SeriesName::new(&self.output_prefix, &self.backend_id, phase)
    }

    /// Check the descriptor before a run.
    pub fn validate(&self) -> Result<()> {
        if self.backend_id.trim().is_empty() {
            return Err(Error::Config("backend id must not be empty".to_string()));
        }
        if self.output_prefix.trim().is_empty() {
            return Err(Error::Config("output prefix must not be empty".to_string()));
        }
        for id in [&self.backend_id, &self.output_prefix] {
            if id.contains(['/', '\\']) {
                return Err(Error::Config(format!(
                    "'{}' must not contain path separators",
                    id
                )));
            }
        }
        if self.cold_iterations == 0 {
            return Err(Error::Config("cold iterations must be at least 1".to_string()));
        }
        if self.warm_iterations == 0 {
            return Err(Error::Config("warm iterations must be at least 1".to_string()));
        }
        Ok(())
    }
}
