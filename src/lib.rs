//! countdown-enrich - read-through enrichment cache for a sports countdown site
//!
//! Team and game pages show two optional extras that come from paid or
//! rate-limited upstreams: an AI-written game preview and an affiliate
//! ticket link. This crate resolves both through a file-backed,
//! TTL-based read-through cache so that page views almost never reach
//! the upstreams.
//!
//! # Example
//!
//! ```rust,no_run
//! use countdown_enrich::{Enrichment, Game, Team};
//!
//! #[tokio::main]
//! async fn main() -> countdown_enrich::Result<()> {
//!     let enrichment = Enrichment::builder()
//!         .cache_dir("data/cache")
//!         .gemini("your-google-ai-key")
//!         .build()?;
//!
//!     let chiefs = Team::new(12, "Kansas City Chiefs", "Chiefs", "KC");
//!     let bills = Team::new(2, "Buffalo Bills", "Bills", "BUF");
//!     let game = Game {
//!         id: "401772938".into(),
//!         time: "2026-10-19T20:25:00Z".into(),
//!         home_team: chiefs.clone(),
//!         away_team: bills,
//!     };
//!
//!     if let Some(preview) = enrichment.game_preview("NFL", &game, &chiefs).await {
//!         println!("{preview}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Failure model
//!
//! Nothing here fails a page render. Corrupt or missing cache files read
//! as empty, failed writes are dropped, and upstream errors become `None`.

pub mod cache;
#[cfg(feature = "cli")]
pub mod config;
pub mod enrich;
pub mod error;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheStore, ConcurrencyMode, NegativeCaching, ReadThrough, StoreConfig};
pub use enrich::{Enrichment, EnrichmentBuilder, GamePreviewEnrichment, TicketLinkEnrichment};
pub use error::{EnrichError, Result};
pub use providers::{PreviewProvider, TicketSearch};
pub use types::{AffiliateLinks, Game, Team, TicketCandidate, TicketQuery};
