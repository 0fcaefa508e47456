//! On-disk entry format shared by every cache domain.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One cached value plus the instant it was written.
///
/// Serializes as `{ "value": ..., "cachedAt": "<RFC 3339>" }`. The
/// timestamp is kept as the raw string so that a single unparsable entry
/// expires on its own instead of poisoning the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    pub value: V,
    pub cached_at: String,
}

/// The full contents of one cache file, keyed by cache key.
///
/// A `BTreeMap` so rewrites produce stable, sorted output.
pub type CacheFile<V> = BTreeMap<String, CacheEntry<V>>;

impl<V> CacheEntry<V> {
    /// Create an entry stamped with `at` (millisecond precision, `Z` suffix).
    pub fn new(value: V, at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Parsed write time, or `None` if `cachedAt` is not a valid instant.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.cached_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Fresh iff `now - cachedAt <= ttl`. Unparsable timestamps are never fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let Some(cached_at) = self.cached_at() else {
            return false;
        };
        match now.signed_duration_since(cached_at).to_std() {
            Ok(age) => age <= ttl,
            // written "in the future" (clock skew): age is negative
            Err(_) => true,
        }
    }
}

/// Keep only the entries that are still fresh at `now`.
pub fn purge_expired<V>(file: CacheFile<V>, now: DateTime<Utc>, ttl: Duration) -> CacheFile<V> {
    file.into_iter()
        .filter(|(_, entry)| entry.is_fresh(now, ttl))
        .collect()
}
