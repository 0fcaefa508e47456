//! JSON-file-backed cache store for a single enrichment domain.
//!
//! Every operation works on the whole file: `get` loads and parses it,
//! `set` loads it, patches one key and rewrites it. There is no
//! background sweep; instead a small fraction of `set` calls (the purge
//! probability, 5% by default) also drop every expired entry before the
//! rewrite. That bounds file growth without a scheduler.
//!
//! # Failure policy
//!
//! The store fails open. A missing or corrupt file reads as empty, and a
//! failed write is logged and dropped. Callers never see an error from
//! this module; at worst they see a miss.
//!
//! # Concurrency
//!
//! Every write goes to a uniquely named temp file in the same directory
//! and is renamed over the cache file, so readers see either the old or
//! the new file, never a partial one.
//!
//! With [`StoreConfig::synchronized`] off (the default), concurrent `set`
//! calls still race on read-modify-write and the last writer wins: another
//! writer's key may be lost until it is resolved again. Turning it on
//! serializes `set` behind an async mutex.

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::entry::{CacheEntry, CacheFile, purge_expired};
use crate::telemetry;

/// Default chance that a `set` also sweeps expired entries.
pub const DEFAULT_PURGE_PROBABILITY: f64 = 0.05;

/// Per-domain store settings.
///
/// ```rust
/// # use countdown_enrich::cache::StoreConfig;
/// # use std::time::Duration;
/// let config = StoreConfig::new(Duration::from_secs(3600))
///     .purge_probability(0.1)
///     .synchronized(true);
/// assert_eq!(config.ttl, Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum age at which an entry is still served.
    pub ttl: Duration,
    /// Probability in `[0, 1]` that a `set` runs the expiry sweep. Default: 0.05.
    pub purge_probability: f64,
    /// Serialize read-modify-write cycles. Default: false.
    pub synchronized: bool,
}

impl StoreConfig {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            purge_probability: DEFAULT_PURGE_PROBABILITY,
            synchronized: false,
        }
    }

    /// Set the sweep probability. Values outside `[0, 1]` are clamped.
    pub fn purge_probability(mut self, p: f64) -> Self {
        self.purge_probability = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self
    }

    pub fn synchronized(mut self, enabled: bool) -> Self {
        self.synchronized = enabled;
        self
    }
}

/// Durable key → entry map for one cache domain.
///
/// `V` is the stored value type. Domains that remember negative results
/// store `Option<T>`, so [`get`](Self::get) yields `Option<Option<T>>`:
/// the outer `None` is "no usable entry", `Some(None)` is "checked,
/// nothing available".
pub struct CacheStore<V> {
    domain: String,
    path: PathBuf,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
    _value: PhantomData<fn() -> V>,
}

impl<V> CacheStore<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Create a store for `domain` persisted at `path`.
    ///
    /// Nothing touches the filesystem until the first read or write.
    pub fn new(domain: impl Into<String>, path: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
            config,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
            _value: PhantomData,
        }
    }

    /// Replace the time source (tests, replay tools).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Whether `entry` would be served right now.
    pub fn is_fresh(&self, entry: &CacheEntry<V>) -> bool {
        entry.is_fresh(self.clock.now(), self.config.ttl)
    }

    /// Load the whole file. Missing or unparsable files read as empty.
    pub async fn read(&self) -> CacheFile<V> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheFile::new(),
            Err(e) => {
                warn!(domain = %self.domain, path = %self.path.display(), error = %e, "failed to read cache file");
                return CacheFile::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                warn!(domain = %self.domain, path = %self.path.display(), error = %e, "corrupt cache file, treating as empty");
                CacheFile::new()
            }
        }
    }

    /// Overwrite the file with `file`, creating the parent directory if needed.
    ///
    /// Failures are logged and swallowed.
    pub async fn write(&self, file: &CacheFile<V>) {
        if let Err(e) = self.persist(file).await {
            metrics::counter!(telemetry::CACHE_WRITE_FAILURES_TOTAL, "domain" => self.domain.clone())
                .increment(1);
            warn!(domain = %self.domain, path = %self.path.display(), error = %e, "failed to write cache file");
        }
    }

    async fn persist(&self, file: &CacheFile<V>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(file).map_err(std::io::Error::other)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &json))
            .await
            .map_err(std::io::Error::other)?
    }

    /// Fresh value for `key`, or `None` if the key is missing or stale.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut file = self.read().await;
        let found = file
            .remove(key)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.value);

        if found.is_some() {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "domain" => self.domain.clone())
                .increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "domain" => self.domain.clone())
                .increment(1);
        }
        found
    }

    /// Insert or overwrite `key`, occasionally sweeping expired entries,
    /// then rewrite the file.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let _guard = if self.config.synchronized {
            Some(self.write_lock.lock().await)
        } else {
            None
        };

        let mut file = self.read().await;
        file.insert(key.into(), CacheEntry::new(value, self.clock.now()));

        if self.should_purge() {
            let before = file.len();
            file = self.purge(file);
            metrics::counter!(telemetry::CACHE_PURGES_TOTAL, "domain" => self.domain.clone())
                .increment(1);
            debug!(domain = %self.domain, removed = before - file.len(), "purged expired cache entries");
        }

        self.write(&file).await;
    }

    /// Copy of `file` without expired or unparsable entries.
    pub fn purge(&self, file: CacheFile<V>) -> CacheFile<V> {
        purge_expired(file, self.clock.now(), self.config.ttl)
    }

    /// Sweep the file unconditionally. Returns the number of entries removed.
    pub async fn purge_now(&self) -> usize {
        let _guard = if self.config.synchronized {
            Some(self.write_lock.lock().await)
        } else {
            None
        };

        let file = self.read().await;
        let before = file.len();
        let file = self.purge(file);
        let removed = before - file.len();
        if removed > 0 {
            self.write(&file).await;
        }
        metrics::counter!(telemetry::CACHE_PURGES_TOTAL, "domain" => self.domain.clone())
            .increment(1);
        removed
    }

    fn should_purge(&self) -> bool {
        let p = self.config.purge_probability;
        if p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            rand::thread_rng().gen_bool(p)
        }
    }
}

/// Write `contents` to a fresh temp file next to `path`, then rename it over `path`.
fn replace_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
