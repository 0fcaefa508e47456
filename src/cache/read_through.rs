//! Get-or-compute protocol shared by the enrichment domains.
//!
//! ```text
//! get(key) ── fresh entry ──────────────────────────────▶ return it
//!    │
//!    └─ miss ─▶ compute() ─▶ negative && policy == Skip ─▶ return it
//!                    │
//!                    └──────▶ set(key, value) ──────────▶ return it
//! ```
//!
//! `compute` resolves to `Option<T>` and never fails: each domain folds
//! its own upstream errors into `None` before the value gets here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::trace;

use super::store::CacheStore;

/// Idle time after which an unused per-key lock is dropped.
///
/// The table has no size bound: evicting a lock that is still held would
/// hand the next caller a fresh mutex and run a second compute. A key's
/// lock is only dropped after nobody has asked for it for this long.
const KEY_LOCK_IDLE: Duration = Duration::from_secs(300);

/// Whether a `None` result from `compute` is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeCaching {
    /// Store the negative; later lookups hit it until the TTL runs out.
    Cache,
    /// Do not store it; every lookup for the key calls upstream again.
    Skip,
}

/// How concurrent misses for one key behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// Each miss calls `compute` and rewrites the file independently.
    /// Concurrent misses duplicate upstream calls and may lose updates.
    #[default]
    Unsynchronized,
    /// Misses for the same key queue on a per-key lock and re-check the
    /// store, so they share one upstream call. Pair with a synchronized
    /// [`StoreConfig`](super::StoreConfig) to also stop lost updates.
    Coalesced,
}

/// Read-through cache over a [`CacheStore`] of `Option<T>` values.
pub struct ReadThrough<T> {
    store: CacheStore<Option<T>>,
    mode: ConcurrencyMode,
    key_locks: moka::sync::Cache<String, Arc<Mutex<()>>>,
}

impl<T> ReadThrough<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(store: CacheStore<Option<T>>, mode: ConcurrencyMode) -> Self {
        let key_locks = moka::sync::Cache::builder()
            .time_to_idle(KEY_LOCK_IDLE)
            .build();
        Self {
            store,
            mode,
            key_locks,
        }
    }

    pub fn store(&self) -> &CacheStore<Option<T>> {
        &self.store
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Return the cached value for `key`, or compute, maybe persist, and
    /// return a fresh one.
    ///
    /// A cached negative (`Some(None)` in the store) is a hit: `compute`
    /// is not called.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        policy: NegativeCaching,
        compute: F,
    ) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        match self.mode {
            ConcurrencyMode::Unsynchronized => self.resolve(key, policy, compute).await,
            ConcurrencyMode::Coalesced => {
                let lock = self.key_lock(key);
                let _guard = lock.lock().await;
                self.resolve(key, policy, compute).await
            }
        }
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .get_with(key.to_owned(), || Arc::new(Mutex::new(())))
    }

    async fn resolve<F, Fut>(&self, key: &str, policy: NegativeCaching, compute: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        if let Some(cached) = self.store.get(key).await {
            trace!(domain = self.store.domain(), key, negative = cached.is_none(), "cache hit");
            return cached;
        }

        let value = compute().await;

        if policy == NegativeCaching::Cache || value.is_some() {
            self.store.set(key, value.clone()).await;
        } else {
            trace!(domain = self.store.domain(), key, "negative result not cached");
        }
        value
    }
}
