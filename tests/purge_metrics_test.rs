//! Tests for cache metrics and the probabilistic expiry sweep.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to count sweeps and
//! hits without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use countdown_enrich::cache::{CacheStore, ManualClock, StoreConfig};
use countdown_enrich::telemetry;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn store(path: std::path::PathBuf, p: f64, clock: Arc<ManualClock>) -> CacheStore<Option<String>> {
    CacheStore::new("preview", path, StoreConfig::new(DAY).purge_probability(p)).with_clock(clock)
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
    ))
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` keeps the sync `with_local_recorder` closure on the
/// current thread while `block_on` drives the store.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn purge_rate_tracks_probability() {
    const SETS: u64 = 10_000;

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path().join("p.json"), 0.05, clock());

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                for _ in 0..SETS {
                    store.set("game-1", Some("• preview".into())).await;
                }
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let purges = counter_total(&snapshot, telemetry::CACHE_PURGES_TOTAL);
    let rate = purges as f64 / SETS as f64;
    assert!(
        (0.035..=0.065).contains(&rate),
        "purge rate {rate} outside the expected band around 0.05"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn purging_set_removes_expired_entries() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let store = store(dir.path().join("p.json"), 1.0, clock.clone());

    let file = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                store.set("old", Some("stale".into())).await;
                clock.advance(DAY + Duration::from_secs(1));
                store.set("new", Some("fresh".into())).await;
                store.read().await
            })
        })
    });

    assert!(!file.contains_key("old"));
    assert!(file.contains_key("new"));

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_PURGES_TOTAL), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn hits_and_misses_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path().join("p.json"), 0.0, clock());

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                assert!(store.get("k").await.is_none());
                store.set("k", None).await;
                assert!(store.get("k").await.is_some());
                assert!(store.get("k").await.is_some());
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 2);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_PURGES_TOTAL), 0);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path().join("p.json"), 1.0, clock());
    store.set("k", Some("v".into())).await;
    assert!(store.get("k").await.is_some());
}
