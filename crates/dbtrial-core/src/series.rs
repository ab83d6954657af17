//! Timing series and their deterministic names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Benchmark execution regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Fresh session per trial.
    Cold,
    /// One session shared by every trial of the phase.
    Warm,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Cold => "cold",
            Phase::Warm => "warm",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a persisted series: `{output_prefix}_{backend_id}_{phase}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesName(String);

impl SeriesName {
    pub fn new(output_prefix: &str, backend_id: &str, phase: Phase) -> Self {
        Self(format!("{}_{}_{}", output_prefix, backend_id, phase))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered per-trial elapsed times for one (backend, phase) run.
///
/// Trial indices are implicit: entry `k` of the backing vector is trial
/// `k + 1`. Entries are only ever appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingSeries {
    times_ms: Vec<f64>,
}

impl TimingSeries {
    /// Create an empty series with room for `capacity` trials.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            times_ms: Vec::with_capacity(capacity),
        }
    }

    /// Build a series from elapsed times in trial order.
    pub fn from_times(times_ms: Vec<f64>) -> Self {
        Self { times_ms }
    }

    /// Append the next trial. Returns its 1-based index.
    pub fn push(&mut self, elapsed_ms: f64) -> usize {
        self.times_ms.push(elapsed_ms);
        self.times_ms.len()
    }

    pub fn len(&self) -> usize {
        self.times_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_ms.is_empty()
    }

    /// Elapsed times in trial order.
    pub fn times(&self) -> &[f64] {
        &self.times_ms
    }

    /// Iterate `(trial_index, elapsed_ms)` pairs, starting at 1.
    pub fn entries(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.times_ms
            .iter()
            .enumerate()
            .map(|(idx, &ms)| (idx + 1, ms))
    }

    /// Arithmetic mean, 0 for an empty series.
    pub fn mean(&self) -> f64 {
        if self.times_ms.is_empty() {
            return 0.0;
        }
        self.times_ms.iter().sum::<f64>() / self.times_ms.len() as f64
    }
}
