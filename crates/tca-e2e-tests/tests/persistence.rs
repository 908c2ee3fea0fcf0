//! End-to-end persistence tests.
//!
//! These tests verify:
//! 1. Row key ordering and audit scans
//! 2. Persistence failures surface to the caller
//! 3. Alert text reaches the stored record
//! 4. One shared policy is safe across concurrent workers

mod helpers;

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use helpers::{event, memory_sink, persister_at, scenario_policy};
use tca_cli::{process_event, WorkerPool};
use tca_pipeline::{
    decode_timestamp, row_key, row_key_prefix, FileStatusSink, MessageType, PipelineError,
    SinkError, StatusRecord, StatusSink,
};
use tempfile::TempDir;

/// Sink that counts writes and optionally rejects all of them.
#[derive(Debug, Default)]
struct CountingSink {
    puts: AtomicUsize,
    reject: bool,
}

impl CountingSink {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl StatusSink for CountingSink {
    fn put(&self, _key: &str, _record: &StatusRecord) -> Result<(), SinkError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            Err(SinkError::Rejected("table unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Row keys
// ============================================================================

#[test]
fn later_record_sorts_first() {
    let earlier = row_key(MessageType::NonCompliant, 1_000);
    let later = row_key(MessageType::NonCompliant, 2_000);
    assert!(later < earlier);
    assert_eq!(decode_timestamp(&later), Some(2_000));
}

#[test]
fn persisted_keys_follow_message_type() {
    let policy = scenario_policy();
    let sink = memory_sink();

    let cases = [
        (event(Some("fault"), Some("vFW"), Some(90.0)), MessageType::NonCompliant),
        (event(Some("fault"), Some("vFW"), Some(10.0)), MessageType::Compliant),
        (event(Some("heartbeat"), Some("vFW"), Some(90.0)), MessageType::Inapplicable),
        ("not json".to_string(), MessageType::Inapplicable),
    ];
    for (i, (raw, expected)) in cases.iter().enumerate() {
        let millis = 10_000 + i64::try_from(i).unwrap();
        let record = persister_at(&policy, sink.clone(), 0, millis)
            .process(raw)
            .unwrap();
        assert_eq!(record.message_type, *expected);
        assert_eq!(record.row_key, row_key(*expected, millis));
        assert!(sink.get(&record.row_key).is_some());
    }
    assert_eq!(sink.len(), 4);
}

#[test]
fn file_audit_is_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit").join("status.jsonl");
    let policy = scenario_policy();
    let sink: Arc<dyn StatusSink> = Arc::new(FileStatusSink::open(&path).unwrap());

    for (millis, cpu) in [(1_000, 81.0), (3_000, 83.0), (2_000, 82.0)] {
        persister_at(&policy, Arc::clone(&sink), 0, millis)
            .process(&event(Some("fault"), Some("vFW"), Some(cpu)))
            .unwrap();
    }

    let rows =
        FileStatusSink::scan(&path, &row_key_prefix(MessageType::NonCompliant), 10).unwrap();
    let observed: Vec<Option<f64>> = rows.iter().map(|r| r.record.observed_value).collect();
    assert_eq!(observed, vec![Some(83.0), Some(82.0), Some(81.0)]);

    let newest = FileStatusSink::scan(&path, &row_key_prefix(MessageType::NonCompliant), 1).unwrap();
    assert_eq!(newest.len(), 1);
    assert_eq!(newest[0].record.timestamp_millis, 3_000);
}

#[test]
fn same_millisecond_overwrites() {
    let policy = scenario_policy();
    let sink = memory_sink();
    for cpu in [91.0, 92.0] {
        persister_at(&policy, sink.clone(), 0, 5_000)
            .process(&event(Some("fault"), Some("vFW"), Some(cpu)))
            .unwrap();
    }
    assert_eq!(sink.len(), 1);
    let record = sink.get(&row_key(MessageType::NonCompliant, 5_000)).unwrap();
    assert_eq!(record.observed_value, Some(92.0));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn sink_failure_is_reported_once() {
    let policy = scenario_policy();
    let sink = Arc::new(CountingSink::rejecting());

    let err = persister_at(&policy, sink.clone(), 3, 7_000)
        .process(&event(Some("fault"), Some("vFW"), Some(90.0)))
        .unwrap_err();

    match err {
        PipelineError::Persistence { row_key: key, source } => {
            assert_eq!(key, row_key(MessageType::NonCompliant, 7_000));
            assert!(matches!(source, SinkError::Rejected(_)));
        }
        other => panic!("expected persistence error, got {other:?}"),
    }
    assert_eq!(sink.puts(), 1);
}

// ============================================================================
// Alerts
// ============================================================================

#[test]
fn non_compliant_record_carries_alert() {
    let policy = scenario_policy();
    let sink = memory_sink();
    let persister = persister_at(&policy, sink.clone(), 0, 1_000);

    let record = process_event(&persister, &event(Some("fault"), Some("vFW"), Some(90.0))).unwrap();
    let alert: serde_json::Value =
        serde_json::from_str(record.alert_message.as_deref().unwrap()).unwrap();
    assert_eq!(alert["closedLoopControlName"], "ControlLoop-vFW");
    assert_eq!(alert["closedLoopAlarmStart"], 1_500_000_000_000_000_i64);
    assert_eq!(alert["sourceId"], "vfw-e2e");
    assert_eq!(alert["observedValue"], 90.0);

    let compliant =
        process_event(&persister, &event(Some("fault"), Some("vFW"), Some(10.0))).unwrap();
    assert!(compliant.alert_message.is_none());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn shared_policy_across_threads() {
    let policy = scenario_policy();
    let sink = Arc::new(CountingSink::default());

    std::thread::scope(|scope| {
        for worker in 0..4_u32 {
            let policy = Arc::clone(&policy);
            let sink: Arc<dyn StatusSink> = sink.clone();
            scope.spawn(move || {
                let persister = persister_at(&policy, sink, worker, 1_000);
                for i in 0..50 {
                    let cpu = if i % 2 == 0 { 90.0 } else { 10.0 };
                    let record = persister
                        .process(&event(Some("fault"), Some("vFW"), Some(cpu)))
                        .unwrap();
                    assert_eq!(record.instance_id, worker);
                }
            });
        }
    });

    assert_eq!(sink.puts(), 200);
    assert!(policy.contains_domain("fault"));
}

#[tokio::test]
async fn worker_pool_processes_every_line() {
    let policy = scenario_policy();
    let sink = Arc::new(CountingSink::default());
    let dyn_sink: Arc<dyn StatusSink> = sink.clone();

    let mut input = String::new();
    for i in 0..30 {
        let raw = match i % 3 {
            0 => event(Some("fault"), Some("vFW"), Some(95.0)),
            1 => event(Some("fault"), Some("vFW"), Some(5.0)),
            _ => event(Some("heartbeat"), None, None),
        };
        input.push_str(&raw);
        input.push('\n');
        input.push('\n');
    }

    let pool = WorkerPool::new(&policy, &dyn_sink, 3);
    assert_eq!(pool.worker_count(), 3);
    let summary = pool.run(Cursor::new(input.into_bytes())).await.unwrap();

    assert_eq!(summary.processed(), 30);
    assert_eq!(summary.non_compliant(), 10);
    assert_eq!(summary.compliant(), 10);
    assert_eq!(summary.inapplicable(), 10);
    assert_eq!(summary.persistence_failures(), 0);
    assert_eq!(summary.workers.len(), 3);
    assert!(summary.workers.iter().all(|w| w.processed == 10));
    assert_eq!(sink.puts(), 30);
}

#[tokio::test]
async fn worker_pool_counts_failures_and_continues() {
    let policy = scenario_policy();
    let sink: Arc<dyn StatusSink> = Arc::new(CountingSink::rejecting());

    let input = format!(
        "{}\n{}\n",
        event(Some("fault"), Some("vFW"), Some(95.0)),
        event(Some("fault"), Some("vFW"), Some(5.0))
    );
    let summary = WorkerPool::new(&policy, &sink, 1)
        .run(Cursor::new(input.into_bytes()))
        .await
        .unwrap();

    assert_eq!(summary.processed(), 2);
    assert_eq!(summary.persistence_failures(), 2);
    assert_eq!(summary.non_compliant(), 0);
}
