//! Tests for the JSON-file cache store.
//!
//! Uses a `ManualClock` so TTL boundaries can be checked to the second.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use countdown_enrich::cache::{
    CacheEntry, CacheFile, CacheStore, Clock, ManualClock, StoreConfig,
};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const SECOND: Duration = Duration::from_secs(1);

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
    ))
}

fn store_at(
    path: impl Into<std::path::PathBuf>,
    ttl: Duration,
    p: f64,
    clock: Arc<ManualClock>,
) -> CacheStore<Option<String>> {
    CacheStore::new("test", path, StoreConfig::new(ttl).purge_probability(p)).with_clock(clock)
}

// ============================================================================
// Fail-open
// ============================================================================

#[tokio::test]
async fn corrupt_file_reads_as_empty_then_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("previews.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = store_at(&path, DAY, 0.0, clock());
    assert!(store.get("game-1").await.is_none());

    store.set("game-1", Some("• hello".to_string())).await;

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).expect("valid JSON after set");
    assert_eq!(parsed["game-1"]["value"], "• hello");
    assert_eq!(store.get("game-1").await, Some(Some("• hello".to_string())));
}

#[tokio::test]
async fn wrong_shape_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("previews.json");
    std::fs::write(&path, r#"["an", "array"]"#).unwrap();

    let store = store_at(&path, DAY, 0.0, clock());
    assert!(store.read().await.is_empty());
}

#[tokio::test]
async fn set_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("cache").join("cj-tickets.json");

    let store = store_at(&path, WEEK, 0.0, clock());
    store.set("team|2026-10-19", Some("https://example.test/t".into())).await;

    assert!(path.exists());
}

#[tokio::test]
async fn unwritable_path_is_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    // parent "directory" is a regular file, so create_dir_all fails
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let store = store_at(blocker.join("cache.json"), DAY, 0.0, clock());
    store.set("k", Some("v".into())).await;

    assert!(store.get("k").await.is_none());
}

// ============================================================================
// Values and negatives
// ============================================================================

#[tokio::test]
async fn cached_negative_is_distinct_from_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path().join("p.json"), DAY, 0.0, clock());

    store.set("checked", None).await;

    assert_eq!(store.get("checked").await, Some(None));
    assert_eq!(store.get("never-seen").await, None);
}

#[tokio::test]
async fn file_shape_matches_entry_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p.json");
    let store = store_at(&path, DAY, 0.0, clock());

    store.set("game-42", Some("• Great matchup".into())).await;
    store.set("game-43", None).await;

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({
            "game-42": {"value": "• Great matchup", "cachedAt": "2026-10-19T12:00:00.000Z"},
            "game-43": {"value": null, "cachedAt": "2026-10-19T12:00:00.000Z"},
        })
    );
}

#[tokio::test]
async fn set_overwrites_and_restamps() {
    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let store = store_at(dir.path().join("p.json"), DAY, 0.0, clock.clone());

    store.set("k", Some("old".into())).await;
    clock.advance(Duration::from_secs(3600));
    store.set("k", Some("new".into())).await;

    let file = store.read().await;
    assert_eq!(file.len(), 1);
    assert_eq!(file["k"].value.as_deref(), Some("new"));
    assert_eq!(file["k"].cached_at, "2026-10-19T13:00:00.000Z");
}

// ============================================================================
// TTL boundary
// ============================================================================

async fn assert_ttl_boundary(ttl: Duration) {
    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let store = store_at(dir.path().join("ttl.json"), ttl, 0.0, clock.clone());

    store.set("k", Some("v".into())).await;

    clock.advance(ttl - SECOND);
    assert_eq!(store.get("k").await, Some(Some("v".into())), "hit just before TTL");

    clock.advance(SECOND);
    assert!(store.get("k").await.is_some(), "hit exactly at TTL");

    clock.advance(SECOND);
    assert_eq!(store.get("k").await, None, "miss just after TTL");
}

#[tokio::test]
async fn preview_ttl_boundary() {
    assert_ttl_boundary(DAY).await;
}

#[tokio::test]
async fn tickets_ttl_boundary() {
    assert_ttl_boundary(WEEK).await;
}

#[tokio::test]
async fn stale_entry_stays_on_disk_until_purged() {
    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let store = store_at(dir.path().join("p.json"), DAY, 0.0, clock.clone());

    store.set("old", Some("v".into())).await;
    clock.advance(DAY + SECOND);

    assert!(store.get("old").await.is_none());
    assert!(store.read().await.contains_key("old"));
}

// ============================================================================
// Purge
// ============================================================================

#[tokio::test]
async fn purging_set_drops_expired_and_unparsable_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p.json");

    let mut seeded: CacheFile<Option<String>> = CacheFile::new();
    seeded.insert(
        "expired".into(),
        CacheEntry::new(
            Some("old".into()),
            Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap(),
        ),
    );
    seeded.insert(
        "recent".into(),
        CacheEntry::new(
            Some("recent".into()),
            Utc.with_ymd_and_hms(2026, 10, 19, 11, 0, 0).unwrap(),
        ),
    );
    seeded.insert(
        "garbled".into(),
        CacheEntry {
            value: None,
            cached_at: "yesterday-ish".into(),
        },
    );
    std::fs::write(&path, serde_json::to_string(&seeded).unwrap()).unwrap();

    let store = store_at(&path, DAY, 1.0, clock());
    store.set("new", Some("fresh".into())).await;

    let file = store.read().await;
    let keys: Vec<&str> = file.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["new", "recent"]);
}

#[tokio::test]
async fn zero_probability_never_purges() {
    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let store = store_at(dir.path().join("p.json"), DAY, 0.0, clock.clone());

    store.set("a", Some("v".into())).await;
    clock.advance(DAY * 2);
    for i in 0..50 {
        store.set(format!("k{i}"), None).await;
    }

    assert!(store.read().await.contains_key("a"));
}

#[tokio::test]
async fn purge_now_reports_removed_count() {
    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let store = store_at(dir.path().join("p.json"), DAY, 0.0, clock.clone());

    store.set("a", Some("1".into())).await;
    store.set("b", None).await;
    clock.advance(Duration::from_secs(12 * 3600));
    store.set("c", Some("3".into())).await;
    clock.advance(Duration::from_secs(13 * 3600));

    assert_eq!(store.purge_now().await, 2);
    assert_eq!(store.purge_now().await, 0);
    assert_eq!(store.get("c").await, Some(Some("3".into())));
}

// ============================================================================
// Concurrent access
// ============================================================================

fn files_in(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn writes_leave_no_temp_files() {
    for synchronized in [false, true] {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let store: CacheStore<Option<String>> = CacheStore::new(
            "test",
            &path,
            StoreConfig::new(DAY)
                .purge_probability(0.0)
                .synchronized(synchronized),
        )
        .with_clock(clock());

        store.set("k", Some("v".into())).await;
        store.set("k2", None).await;

        assert_eq!(files_in(dir.path()), vec!["p.json".to_string()]);
        assert_eq!(store.get("k").await, Some(Some("v".into())));
    }
}

/// Readers racing unsynchronized writers must never see a partial file:
/// a fresh key stays a hit and earlier keys survive every rewrite.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unsynchronized_writes_never_expose_partial_file() {
    const SEEDED: usize = 3000;

    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let path = dir.path().join("p.json");

    let mut seeded: CacheFile<Option<String>> = CacheFile::new();
    for i in 0..SEEDED {
        seeded.insert(
            format!("pre-{i}"),
            CacheEntry::new(Some(format!("preview {i}")), clock.now()),
        );
    }
    std::fs::write(&path, serde_json::to_string_pretty(&seeded).unwrap()).unwrap();

    let store = Arc::new(store_at(&path, DAY, 0.0, clock));

    let mut writers = Vec::new();
    for w in 0..4 {
        let store = store.clone();
        writers.push(tokio::spawn(async move {
            for i in 0..20 {
                store.set(format!("new-{w}-{i}"), Some("v".into())).await;
            }
        }));
    }
    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        readers.push(tokio::spawn(async move {
            let mut misses = 0;
            for _ in 0..40 {
                if store.get("pre-1").await.is_none() {
                    misses += 1;
                }
            }
            misses
        }));
    }

    for writer in writers {
        writer.await.unwrap();
    }
    let mut misses = 0;
    for reader in readers {
        misses += reader.await.unwrap();
    }

    assert_eq!(misses, 0, "fresh key read as a miss");
    let file = store.read().await;
    let surviving = (0..SEEDED)
        .filter(|i| file.contains_key(&format!("pre-{i}")))
        .count();
    assert_eq!(surviving, SEEDED);
}

#[tokio::test]
async fn synchronized_concurrent_sets_keep_every_key() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<CacheStore<Option<String>>> = Arc::new(
        CacheStore::new(
            "test",
            dir.path().join("p.json"),
            StoreConfig::new(DAY).purge_probability(0.0).synchronized(true),
        )
        .with_clock(clock()),
    );

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.set(format!("key-{i}"), Some(i.to_string())).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.read().await.len(), 16);
}
