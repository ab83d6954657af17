//! Single-trial execution.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::adapter::{Adapter, Params, QuerySpec};

/// Elapsed time recorded for a trial whose result could not be validated.
pub const SENTINEL_ELAPSED_MS: f64 = 0.0;

/// Outcome of one trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    /// The adapter reported a valid elapsed time.
    Measured(f64),
    /// The trial failed or returned a malformed result.
    Sentinel { reason: String },
}

impl TrialOutcome {
    /// Elapsed time to record in the series.
    pub fn elapsed_ms(&self) -> f64 {
        match self {
            TrialOutcome::Measured(ms) => *ms,
            TrialOutcome::Sentinel { .. } => SENTINEL_ELAPSED_MS,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, TrialOutcome::Sentinel { .. })
    }
}

/// Run the query once over an already connected adapter.
///
/// Never fails: adapter errors, malformed envelopes and panics inside the
/// adapter all degrade to [`TrialOutcome::Sentinel`]. No retries.
pub async fn run_trial<A: Adapter>(
    adapter: &mut A,
    query: &QuerySpec,
    params: Option<&Params>,
) -> TrialOutcome {
    let result = AssertUnwindSafe(adapter.run_query(query, params))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(timed)) => match timed.validate() {
            Ok(ms) => TrialOutcome::Measured(ms),
            Err(e) => TrialOutcome::Sentinel {
                reason: e.to_string(),
            },
        },
        Ok(Err(e)) => TrialOutcome::Sentinel {
            reason: e.to_string(),
        },
        Err(panic) => TrialOutcome::Sentinel {
            reason: format!("adapter panicked: {}", panic_message(&*panic)),
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::TimedResult;
    use crate::error::AdapterError;

    enum Reply {
        Ok(f64),
        Missing,
        Err,
        Panic,
    }

    struct Scripted(Reply);

    impl Adapter for Scripted {
        async fn connect(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }

        fn close(&mut self) {}

        async fn run_query(
            &mut self,
            _query: &QuerySpec,
            _params: Option<&Params>,
        ) -> Result<TimedResult, AdapterError> {
            match self.0 {
                Reply::Ok(ms) => Ok(TimedResult::new(ms, 1)),
                Reply::Missing => Ok(TimedResult::missing_timing()),
                Reply::Err => Err(AdapterError::Query("relation does not exist".into())),
                Reply::Panic => panic!("driver bug"),
            }
        }
    }

    async fn outcome(reply: Reply) -> TrialOutcome {
        run_trial(&mut Scripted(reply), &QuerySpec::text("q"), None).await
    }

    #[tokio::test]
    async fn test_measured() {
        assert_eq!(outcome(Reply::Ok(7.25)).await, TrialOutcome::Measured(7.25));
    }

    #[tokio::test]
    async fn test_missing_timing_is_sentinel() {
        let result = outcome(Reply::Missing).await;
        assert!(result.is_sentinel());
        assert_eq!(result.elapsed_ms(), 0.0);
    }

    #[tokio::test]
    async fn test_negative_timing_is_sentinel() {
        let result = outcome(Reply::Ok(-3.0)).await;
        assert!(result.is_sentinel());
        assert_eq!(result.elapsed_ms(), 0.0);
    }

    #[tokio::test]
    async fn test_adapter_error_is_sentinel() {
        let result = outcome(Reply::Err).await;
        match result {
            TrialOutcome::Sentinel { reason } => assert!(reason.contains("relation")),
            other => panic!("expected sentinel, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_is_sentinel() {
        let result = outcome(Reply::Panic).await;
        match result {
            TrialOutcome::Sentinel { reason } => assert!(reason.contains("driver bug")),
            other => panic!("expected sentinel, got {:?}", other),
        }
    }
}
