//! Caching subsystem.
//!
//! - [`CacheStore`]: one JSON file per domain, TTL-aware reads and a
//!   probabilistic expiry sweep piggybacked on writes.
//!
//! - [`ReadThrough`]: the get-or-compute protocol on top of a store,
//!   with a per-call [`NegativeCaching`] policy and an optional
//!   [`ConcurrencyMode::Coalesced`] mode for concurrent misses.
//!
//! - [`Clock`]: the time source TTLs are checked against.

pub mod clock;
pub mod entry;
pub mod read_through;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheFile, purge_expired};
pub use read_through::{ConcurrencyMode, NegativeCaching, ReadThrough};
pub use store::{CacheStore, DEFAULT_PURGE_PROBABILITY, StoreConfig};
