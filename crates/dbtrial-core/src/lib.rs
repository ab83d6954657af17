//! dbtrial benchmark harness.
//!
//! Runs the same logical query against heterogeneous database backends
//! under two regimes and records per-trial latency:
//!
//! - **Cold**: a fresh session is opened and closed around every trial.
//! - **Warm**: one session is shared by every trial of the phase.
//!
//! Backends plug in through the [`Adapter`] trait. Each phase produces a
//! fixed-length [`TimingSeries`]; a trial whose result cannot be validated
//! is recorded as a `0.0` sentinel rather than dropped, so series from
//! different backends stay aligned.
//!
//! # Example
//!
//! ```ignore
//! use dbtrial_core::{CsvSink, Orchestrator, QuerySpec, RunDescriptor};
//!
//! let desc = RunDescriptor::new("sqlite", "Query 1").with_output_prefix("sqlite_query1");
//! let mut orchestrator = Orchestrator::new(CsvSink::new("results"));
//! let report = orchestrator
//!     .run(&desc, &mut adapter, &QuerySpec::text("SELECT * FROM t"), None)
//!     .await?;
//! println!("speedup: {:.2}x", report.speedup());
//! ```

pub mod adapter;
pub mod batch;
pub mod cancel;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod series;
pub mod sink;
pub mod summary;
pub mod trial;

pub use adapter::{Adapter, Params, QuerySpec, Session, TimedResult};
pub use batch::{
    BatchBackend, BatchConfig, BatchReport, BatchRunner, BenchmarkQuery, PairFailure,
    PairFailurePolicy, DEFAULT_PAIR_PAUSE,
};
pub use cancel::{CancelHandle, CancelSignal};
pub use config::{
    ConnectFailurePolicy, RunDescriptor, DEFAULT_COLD_ITERATIONS, DEFAULT_INTER_TRIAL_PAUSE,
    DEFAULT_WARM_ITERATIONS,
};
pub use error::{AdapterError, Error, Result, SinkError};
pub use orchestrator::{speedup, Orchestrator, PhaseReport, RunReport};
pub use series::{Phase, SeriesName, TimingSeries};
pub use sink::{read_series, write_series, CsvSink, MemorySink, ResultSink};
pub use summary::SeriesSummary;
pub use trial::{run_trial, TrialOutcome, SENTINEL_ELAPSED_MS};
