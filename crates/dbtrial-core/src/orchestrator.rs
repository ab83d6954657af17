//! Two-phase benchmark orchestration.
//!
//! For one (backend, query) pair the orchestrator runs a cold phase, in
//! which every trial gets a fresh session, and then a warm phase, in which
//! all trials share one session. Each phase yields a timing series that is
//! handed to the result sink before the next phase starts.
//!
//! Trials run strictly one after another. Trial `i + 1` never starts before
//! trial `i`, including its `close()` in the cold phase, has finished.
//! There is no per-query timeout: a backend call that never returns stalls
//! the run.

use crate::adapter::{Adapter, Params, QuerySpec, Session};
use crate::cancel::{pause, CancelSignal};
use crate::config::{ConnectFailurePolicy, RunDescriptor};
use crate::error::{AdapterError, Error, Result};
use crate::series::{Phase, SeriesName, TimingSeries};
use crate::sink::ResultSink;
use crate::trial::{run_trial, TrialOutcome};

/// Outcome of one persisted phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub series_name: SeriesName,
    /// Where the sink stored the series.
    pub location: String,
    pub series: TimingSeries,
    /// Number of trials recorded as sentinels.
    pub sentinels: usize,
}

impl PhaseReport {
    /// Mean elapsed time of the phase, sentinels included.
    pub fn avg_ms(&self) -> f64 {
        self.series.mean()
    }
}

/// Summary of a completed (backend, query) run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub backend_id: String,
    pub query_label: String,
    pub cold: PhaseReport,
    pub warm: PhaseReport,
}

impl RunReport {
    /// `cold_avg / warm_avg`, or 0 when the warm average is 0.
    pub fn speedup(&self) -> f64 {
        speedup(self.cold.avg_ms(), self.warm.avg_ms())
    }
}

/// Ratio of cold to warm average, guarded against a zero warm average.
pub fn speedup(cold_avg_ms: f64, warm_avg_ms: f64) -> f64 {
    if warm_avg_ms > 0.0 {
        cold_avg_ms / warm_avg_ms
    } else {
        0.0
    }
}

/// Series being collected for one phase.
struct PhaseRun {
    series: TimingSeries,
    sentinels: usize,
}

impl PhaseRun {
    fn new(iterations: usize) -> Self {
        Self {
            series: TimingSeries::with_capacity(iterations),
            sentinels: 0,
        }
    }

    fn record(&mut self, desc: &RunDescriptor, phase: Phase, outcome: TrialOutcome) {
        let elapsed_ms = outcome.elapsed_ms();
        let trial = self.series.push(elapsed_ms);
        let total = desc.iterations(phase);

        match outcome {
            TrialOutcome::Measured(_) => {
                tracing::debug!(
                    backend = %desc.backend_id,
                    %phase,
                    trial,
                    total,
                    elapsed_ms,
                    "trial complete"
                );
            }
            TrialOutcome::Sentinel { reason } => {
                self.sentinels += 1;
                tracing::warn!(
                    backend = %desc.backend_id,
                    %phase,
                    trial,
                    total,
                    %reason,
                    "trial result invalid, recording sentinel"
                );
            }
        }
    }
}

/// Drives cold and warm phases and persists their series.
pub struct Orchestrator<S> {
    sink: S,
    cancel: Option<CancelSignal>,
    persisted: Vec<SeriesName>,
}

impl<S: ResultSink> Orchestrator<S> {
    /// Create an orchestrator persisting into `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            cancel: None,
            persisted: Vec::new(),
        }
    }

    /// Observe `signal` for cancellation between trials.
    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Series persisted by the most recent call to [`run`](Self::run),
    /// including one that later failed.
    pub fn persisted(&self) -> &[SeriesName] {
        &self.persisted
    }

    pub(crate) fn cancel_signal_mut(&mut self) -> Option<&mut CancelSignal> {
        self.cancel.as_mut()
    }

    /// Run both phases for one (backend, query) pair.
    ///
    /// The adapter is borrowed exclusively for the whole run and is left
    /// closed when this returns, whatever the outcome. With
    /// [`ConnectFailurePolicy::Abort`] a failed `connect()` returns
    /// [`Error::Connection`]; a cold series persisted before a warm-phase
    /// failure is left in place.
    pub async fn run<A: Adapter>(
        &mut self,
        desc: &RunDescriptor,
        adapter: &mut A,
        query: &QuerySpec,
        params: Option<&Params>,
    ) -> Result<RunReport> {
        self.persisted.clear();
        desc.validate()?;

        tracing::info!(
            backend = %desc.backend_id,
            query = %desc.query_label,
            cold_iterations = desc.cold_iterations,
            warm_iterations = desc.warm_iterations,
            "starting benchmark"
        );

        let cold = self.run_cold(desc, adapter, query, params).await?;
        let cold = self.persist(desc, Phase::Cold, cold)?;

        let warm = self.run_warm(desc, adapter, query, params).await?;
        let warm = self.persist(desc, Phase::Warm, warm)?;

        let report = RunReport {
            backend_id: desc.backend_id.clone(),
            query_label: desc.query_label.clone(),
            cold,
            warm,
        };

        tracing::info!(
            backend = %desc.backend_id,
            query = %desc.query_label,
            cold_avg_ms = report.cold.avg_ms(),
            warm_avg_ms = report.warm.avg_ms(),
            speedup = report.speedup(),
            "benchmark complete"
        );

        Ok(report)
    }

    /// One fresh session per trial.
    async fn run_cold<A: Adapter>(
        &mut self,
        desc: &RunDescriptor,
        adapter: &mut A,
        query: &QuerySpec,
        params: Option<&Params>,
    ) -> Result<PhaseRun> {
        let phase = Phase::Cold;
        let mut run = PhaseRun::new(desc.cold_iterations);

        for trial in 1..=desc.cold_iterations {
            self.check_cancelled(desc, phase)?;

            tracing::debug!(
                backend = %desc.backend_id,
                trial,
                total = desc.cold_iterations,
                "connecting for cold trial"
            );

            let outcome = match Session::open(&mut *adapter).await {
                Ok(mut session) => {
                    let outcome = run_trial(session.adapter(), query, params).await;
                    session.close();
                    outcome
                }
                Err(e) => TrialOutcome::Sentinel {
                    reason: connect_failed(desc, phase, e)?,
                },
            };
            run.record(desc, phase, outcome);

            self.pause_between_trials(desc, phase, trial == desc.cold_iterations)
                .await?;
        }

        Ok(run)
    }

    /// One session shared by every trial.
    async fn run_warm<A: Adapter>(
        &mut self,
        desc: &RunDescriptor,
        adapter: &mut A,
        query: &QuerySpec,
        params: Option<&Params>,
    ) -> Result<PhaseRun> {
        let phase = Phase::Warm;
        let mut run = PhaseRun::new(desc.warm_iterations);

        self.check_cancelled(desc, phase)?;
        tracing::info!(
            backend = %desc.backend_id,
            iterations = desc.warm_iterations,
            "connecting for warm phase"
        );

        let mut session = match Session::open(adapter).await {
            Ok(session) => session,
            Err(e) => {
                let reason = connect_failed(desc, phase, e)?;
                for _ in 0..desc.warm_iterations {
                    run.record(
                        desc,
                        phase,
                        TrialOutcome::Sentinel {
                            reason: reason.clone(),
                        },
                    );
                }
                return Ok(run);
            }
        };

        for trial in 1..=desc.warm_iterations {
            self.check_cancelled(desc, phase)?;
            let outcome = run_trial(session.adapter(), query, params).await;
            run.record(desc, phase, outcome);
            self.pause_between_trials(desc, phase, trial == desc.warm_iterations)
                .await?;
        }

        session.close();
        Ok(run)
    }

    fn persist(&mut self, desc: &RunDescriptor, phase: Phase, run: PhaseRun) -> Result<PhaseReport> {
        let series_name = desc.series_name(phase);
        debug_assert_eq!(run.series.len(), desc.iterations(phase));

        let location = self.sink.persist(&series_name, &run.series)?;
        self.persisted.push(series_name.clone());

        tracing::info!(
            backend = %desc.backend_id,
            %phase,
            series = %series_name,
            %location,
            avg_ms = run.series.mean(),
            sentinels = run.sentinels,
            "phase complete"
        );

        Ok(PhaseReport {
            phase,
            series_name,
            location,
            series: run.series,
            sentinels: run.sentinels,
        })
    }

    fn check_cancelled(&self, desc: &RunDescriptor, phase: Phase) -> Result<()> {
        match &self.cancel {
            Some(signal) if signal.is_cancelled() => Err(cancelled(desc, phase)),
            _ => Ok(()),
        }
    }

    /// Pause after a trial. A cancellation during the pause that follows
    /// the final trial is left for the next check so the finished phase
    /// is still persisted.
    async fn pause_between_trials(
        &mut self,
        desc: &RunDescriptor,
        phase: Phase,
        last_trial: bool,
    ) -> Result<()> {
        if pause(desc.inter_trial_pause, self.cancel.as_mut()).await {
            Ok(())
        } else if last_trial {
            tracing::debug!(
                backend = %desc.backend_id,
                %phase,
                "cancellation requested after final trial, keeping phase"
            );
            Ok(())
        } else {
            Err(cancelled(desc, phase))
        }
    }
}

fn cancelled(desc: &RunDescriptor, phase: Phase) -> Error {
    tracing::warn!(backend = %desc.backend_id, %phase, "benchmark cancelled");
    Error::Cancelled {
        backend: desc.backend_id.clone(),
        phase,
    }
}

/// Apply the connect failure policy. Returns the sentinel reason when the
/// run should continue.
fn connect_failed(desc: &RunDescriptor, phase: Phase, err: AdapterError) -> Result<String> {
    match desc.connect_failure {
        ConnectFailurePolicy::Abort => {
            tracing::error!(
                backend = %desc.backend_id,
                %phase,
                error = %err,
                "connect failed, aborting run"
            );
            Err(Error::Connection {
                backend: desc.backend_id.clone(),
                message: err.to_string(),
            })
        }
        ConnectFailurePolicy::Sentinel => {
            tracing::warn!(
                backend = %desc.backend_id,
                %phase,
                error = %err,
                "connect failed, recording sentinel"
            );
            Ok(err.to_string())
        }
    }
}
