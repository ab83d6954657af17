//! Integration tests for cold/warm orchestration.

mod common;

use std::fs;
use std::time::Duration;

use common::{Event, MockAdapter};
use dbtrial_core::{
    read_series, CancelHandle, ConnectFailurePolicy, CsvSink, Error, MemorySink, Orchestrator,
    Phase, QuerySpec, RunDescriptor, RunReport,
};

fn descriptor(cold: usize, warm: usize) -> RunDescriptor {
    RunDescriptor::new("mock", "Query 1 - scan")
        .with_cold_iterations(cold)
        .with_warm_iterations(warm)
        .with_output_prefix("mock_query1")
        .with_inter_trial_pause(Duration::ZERO)
}

fn query() -> QuerySpec {
    QuerySpec::text("MATCH (n) RETURN n")
}

#[tokio::test]
async fn test_constant_latency_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::new(CsvSink::new(dir.path()));
    let mut adapter = MockAdapter::new(10.0);

    let report = orchestrator
        .run(&descriptor(3, 2), &mut adapter, &query(), None)
        .await
        .unwrap();

    let cold: Vec<_> = report.cold.series.entries().collect();
    let warm: Vec<_> = report.warm.series.entries().collect();
    assert_eq!(cold, vec![(1, 10.0), (2, 10.0), (3, 10.0)]);
    assert_eq!(warm, vec![(1, 10.0), (2, 10.0)]);
    assert_eq!(report.cold.avg_ms(), 10.0);
    assert_eq!(report.warm.avg_ms(), 10.0);
    assert_eq!(report.speedup(), 1.0);
    assert_eq!(report.cold.sentinels, 0);

    let cold_csv = fs::read_to_string(dir.path().join("mock_query1_mock_cold.csv")).unwrap();
    assert_eq!(cold_csv, "iteration,execution_time_ms\n1,10.0\n2,10.0\n3,10.0\n");
    let warm_csv = fs::read_to_string(dir.path().join("mock_query1_mock_warm.csv")).unwrap();
    assert_eq!(warm_csv, "iteration,execution_time_ms\n1,10.0\n2,10.0\n");
}

#[tokio::test]
async fn test_malformed_result_becomes_sentinel() {
    let mut orchestrator = Orchestrator::new(MemorySink::new());
    let mut adapter = MockAdapter::new(4.5).malformed_on(&[2]);

    let report = orchestrator
        .run(&descriptor(3, 1), &mut adapter, &query(), None)
        .await
        .unwrap();

    let cold: Vec<_> = report.cold.series.entries().collect();
    assert_eq!(cold, vec![(1, 4.5), (2, 0.0), (3, 4.5)]);
    assert_eq!(report.cold.sentinels, 1);
    assert_eq!(report.warm.series.times(), &[4.5]);
}

#[tokio::test]
async fn test_errors_and_panics_become_sentinels() {
    let mut orchestrator = Orchestrator::new(MemorySink::new());
    // Calls 1-2 are cold trials, 3-5 are warm trials.
    let mut adapter = MockAdapter::new(2.0).error_on(&[1]).panic_on(&[4]);

    let report = orchestrator
        .run(&descriptor(2, 3), &mut adapter, &query(), None)
        .await
        .unwrap();

    assert_eq!(report.cold.series.times(), &[0.0, 2.0]);
    assert_eq!(report.warm.series.times(), &[2.0, 0.0, 2.0]);
    assert_eq!(report.cold.sentinels, 1);
    assert_eq!(report.warm.sentinels, 1);
    assert!(!adapter.open);
}

#[tokio::test]
async fn test_connection_lifecycle() {
    let mut orchestrator = Orchestrator::new(MemorySink::new());
    let mut adapter = MockAdapter::new(1.0);

    orchestrator
        .run(&descriptor(3, 2), &mut adapter, &query(), None)
        .await
        .unwrap();

    use Event::*;
    assert_eq!(
        adapter.events,
        vec![
            Connect, Query, Close, // cold 1
            Connect, Query, Close, // cold 2
            Connect, Query, Close, // cold 3
            Connect, Query, Query, Close, // warm
        ]
    );
    assert!(!adapter.query_while_closed);
    assert!(!adapter.open);
}

#[tokio::test]
async fn test_series_length_matches_configuration() {
    for (cold, warm, bad) in [
        (1usize, 1usize, vec![]),
        (5, 4, vec![1, 5, 6]),
        (31, 30, vec![2, 3, 17, 40, 61]),
        (7, 2, (1..=9).collect::<Vec<_>>()),
    ] {
        let mut orchestrator = Orchestrator::new(MemorySink::new());
        let mut adapter = MockAdapter::new(3.0).malformed_on(&bad);

        let report = orchestrator
            .run(&descriptor(cold, warm), &mut adapter, &query(), None)
            .await
            .unwrap();

        assert_eq!(report.cold.series.len(), cold);
        assert_eq!(report.warm.series.len(), warm);
        assert_eq!(report.cold.sentinels + report.warm.sentinels, bad.len());

        for report in [&report.cold, &report.warm] {
            let indices: Vec<_> = report.series.entries().map(|(i, _)| i).collect();
            let expected: Vec<_> = (1..=report.series.len()).collect();
            assert_eq!(indices, expected);
            assert!(report.series.times().iter().all(|ms| *ms >= 0.0));
        }
    }
}

async fn run_once(desc: &RunDescriptor) -> (RunReport, MemorySink) {
    let mut orchestrator = Orchestrator::new(MemorySink::new());
    let mut adapter = MockAdapter::new(6.25).malformed_on(&[2]);
    let report = orchestrator
        .run(desc, &mut adapter, &query(), None)
        .await
        .unwrap();
    (report, orchestrator.into_sink())
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let desc = descriptor(4, 3);
    let (first, first_sink) = run_once(&desc).await;
    let (second, second_sink) = run_once(&desc).await;

    assert_eq!(first, second);
    for name in ["mock_query1_mock_cold", "mock_query1_mock_warm"] {
        let bits = |sink: &MemorySink| -> Vec<u64> {
            sink.get(name).unwrap().times().iter().map(|t| t.to_bits()).collect()
        };
        assert_eq!(bits(&first_sink), bits(&second_sink));
    }
}

#[tokio::test]
async fn test_warm_connect_failure_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::new(CsvSink::new(dir.path()));
    // Connect calls 1-3 are cold trials, call 4 is the warm session.
    let mut adapter = MockAdapter::new(10.0).fail_connect_on(&[4]);

    let err = orchestrator
        .run(&descriptor(3, 2), &mut adapter, &query(), None)
        .await
        .unwrap_err();

    assert!(err.is_connection(), "unexpected error: {}", err);
    assert!(matches!(err, Error::Connection { ref backend, .. } if backend == "mock"));

    let cold_path = dir.path().join("mock_query1_mock_cold.csv");
    let cold = read_series(&cold_path).unwrap();
    assert_eq!(cold.times(), &[10.0, 10.0, 10.0]);
    assert!(!dir.path().join("mock_query1_mock_warm.csv").exists());
    assert_eq!(adapter.count(Event::Query), 3);
    assert!(!adapter.open);
}

#[tokio::test]
async fn test_cold_connect_failure_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::new(CsvSink::new(dir.path()));
    let mut adapter = MockAdapter::new(10.0).fail_connect_on(&[2]);

    let err = orchestrator
        .run(&descriptor(3, 2), &mut adapter, &query(), None)
        .await
        .unwrap_err();

    assert!(err.is_connection());
    assert!(!dir.path().join("mock_query1_mock_cold.csv").exists());
    assert!(!dir.path().join("mock_query1_mock_warm.csv").exists());

    use Event::*;
    assert_eq!(
        adapter.events,
        vec![Connect, Query, Close, ConnectFailed, Close]
    );
}

#[tokio::test]
async fn test_sentinel_policy_keeps_series_length() {
    let mut orchestrator = Orchestrator::new(MemorySink::new());
    // Cold trial 2 and the warm session fail to connect.
    let mut adapter = MockAdapter::new(8.0).fail_connect_on(&[2, 4]);
    let desc = descriptor(3, 2).with_connect_failure(ConnectFailurePolicy::Sentinel);

    let report = orchestrator
        .run(&desc, &mut adapter, &query(), None)
        .await
        .unwrap();

    assert_eq!(report.cold.series.times(), &[8.0, 0.0, 8.0]);
    assert_eq!(report.warm.series.times(), &[0.0, 0.0]);
    assert_eq!(report.cold.sentinels, 1);
    assert_eq!(report.warm.sentinels, 2);
    assert_eq!(report.speedup(), 0.0);
    assert_eq!(adapter.count(Event::Query), 2);
    assert!(orchestrator.sink().get("mock_query1_mock_warm").is_some());
}

#[tokio::test]
async fn test_invalid_descriptor_rejected() {
    let mut orchestrator = Orchestrator::new(MemorySink::new());
    let mut adapter = MockAdapter::new(1.0);

    let err = orchestrator
        .run(&descriptor(0, 2), &mut adapter, &query(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(adapter.events.is_empty());
}

#[tokio::test]
async fn test_cancel_before_start() {
    let handle = CancelHandle::new();
    let mut orchestrator = Orchestrator::new(MemorySink::new()).with_cancel(handle.signal());
    let mut adapter = MockAdapter::new(1.0);
    handle.cancel();

    let err = orchestrator
        .run(&descriptor(3, 2), &mut adapter, &query(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { phase: Phase::Cold, .. }));
    assert!(adapter.events.is_empty());
    assert!(orchestrator.sink().is_empty());
}

#[tokio::test]
async fn test_cancel_during_warm_phase_closes_session() {
    let handle = CancelHandle::new();
    let mut orchestrator = Orchestrator::new(MemorySink::new()).with_cancel(handle.signal());
    // Query call 4 is the first warm trial.
    let mut adapter = MockAdapter::new(1.0).cancel_after_query(4, handle);

    let err = orchestrator
        .run(&descriptor(3, 5), &mut adapter, &query(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { phase: Phase::Warm, .. }));
    assert_eq!(adapter.count(Event::Query), 4);
    assert_eq!(adapter.count(Event::Connect), adapter.count(Event::Close));
    assert!(!adapter.open);

    let sink = orchestrator.sink();
    assert!(sink.get("mock_query1_mock_cold").is_some());
    assert!(sink.get("mock_query1_mock_warm").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_last_cold_trial_keeps_cold_series() {
    let handle = CancelHandle::new();
    let mut orchestrator = Orchestrator::new(MemorySink::new()).with_cancel(handle.signal());
    // Query call 3 is the last cold trial; the cancel lands in the pause after it.
    let mut adapter = MockAdapter::new(2.0).cancel_after_query(3, handle);
    let desc = descriptor(3, 2).with_inter_trial_pause(Duration::from_millis(200));

    let err = orchestrator
        .run(&desc, &mut adapter, &query(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { phase: Phase::Warm, .. }));
    assert_eq!(adapter.count(Event::Query), 3);
    assert!(!adapter.open);

    let sink = orchestrator.sink();
    assert_eq!(sink.get("mock_query1_mock_cold").unwrap().times(), &[2.0, 2.0, 2.0]);
    assert!(sink.get("mock_query1_mock_warm").is_none());
    assert_eq!(orchestrator.persisted().len(), 1);
}

#[tokio::test]
async fn test_cancel_after_last_warm_trial_completes_run() {
    let handle = CancelHandle::new();
    let mut orchestrator = Orchestrator::new(MemorySink::new()).with_cancel(handle.signal());
    // Query call 5 is the last warm trial.
    let mut adapter = MockAdapter::new(2.0).cancel_after_query(5, handle);

    let report = orchestrator
        .run(&descriptor(3, 2), &mut adapter, &query(), None)
        .await
        .unwrap();

    assert_eq!(report.warm.series.times(), &[2.0, 2.0]);
    assert!(orchestrator.sink().get("mock_query1_mock_warm").is_some());
    assert!(!adapter.open);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_run_releases_session() {
    let mut orchestrator = Orchestrator::new(MemorySink::new());
    let mut adapter = MockAdapter::new(1.0).with_query_delay(Duration::from_secs(3600));

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        orchestrator.run(&descriptor(3, 2), &mut adapter, &query(), None),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(adapter.events, vec![Event::Connect, Event::Query, Event::Close]);
    assert!(!adapter.open);
}

#[tokio::test(start_paused = true)]
async fn test_inter_trial_pause_is_applied() {
    let mut orchestrator = Orchestrator::new(MemorySink::new());
    let mut adapter = MockAdapter::new(1.0);
    let desc = descriptor(3, 2).with_inter_trial_pause(Duration::from_millis(200));

    let start = tokio::time::Instant::now();
    orchestrator
        .run(&desc, &mut adapter, &query(), None)
        .await
        .unwrap();

    // Five trials, one pause after each.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1100), "{:?}", elapsed);
}
