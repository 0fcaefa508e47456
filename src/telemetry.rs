//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus,
//! statsd); without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `countdown_enrich_`. Counters end in
//! `_total`, histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `domain`: cache domain (`"preview"` or `"tickets"`)
//! - `provider`: upstream name (`"gemini"`, `"cj"`)
//! - `status`: outcome: "ok" or "error"

/// Fresh entries served from a cache file (including cached negatives).
///
/// Labels: `domain`.
pub const CACHE_HITS_TOTAL: &str = "countdown_enrich_cache_hits_total";

/// Lookups that found no fresh entry.
///
/// Labels: `domain`.
pub const CACHE_MISSES_TOTAL: &str = "countdown_enrich_cache_misses_total";

/// Writes that also ran the expired-entry sweep.
///
/// Labels: `domain`.
pub const CACHE_PURGES_TOTAL: &str = "countdown_enrich_cache_purges_total";

/// Cache file writes that failed and were dropped.
///
/// Labels: `domain`.
pub const CACHE_WRITE_FAILURES_TOTAL: &str = "countdown_enrich_cache_write_failures_total";

/// Upstream calls made on a cache miss.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const UPSTREAM_REQUESTS_TOTAL: &str = "countdown_enrich_upstream_requests_total";

/// Upstream call duration in seconds.
///
/// Labels: `provider`.
pub const UPSTREAM_DURATION_SECONDS: &str = "countdown_enrich_upstream_duration_seconds";
