//! Enrichment domains and the [`Enrichment`] facade route loaders call.
//!
//! Both domains share the [`ReadThrough`](crate::cache::ReadThrough)
//! protocol but deliberately differ in negative caching:
//!
//! | domain   | key                   | TTL    | caches `None`? |
//! |----------|-----------------------|--------|----------------|
//! | preview  | game id               | 24h    | yes            |
//! | tickets  | `team-slug\|YYYY-MM-DD` | 7 days | no             |

mod builder;
pub mod preview;
pub mod tickets;

pub use builder::{DEFAULT_CACHE_DIR, EnrichmentBuilder};
pub use preview::GamePreviewEnrichment;
pub use tickets::TicketLinkEnrichment;

use std::time::Instant;

use crate::telemetry;
use crate::types::{AffiliateLinks, Game, Team};

/// Both enrichments behind one handle.
///
/// Build with [`Enrichment::builder()`]. Every method resolves to an
/// `Option` and never fails; callers render the UI element only when a
/// value is present.
pub struct Enrichment {
    previews: GamePreviewEnrichment,
    tickets: TicketLinkEnrichment,
}

impl Enrichment {
    /// Create a new builder.
    pub fn builder() -> EnrichmentBuilder {
        EnrichmentBuilder::new()
    }

    pub(crate) fn new(previews: GamePreviewEnrichment, tickets: TicketLinkEnrichment) -> Self {
        Self { previews, tickets }
    }

    /// Cached preview for `game` on `team`'s page.
    pub async fn game_preview(&self, league: &str, game: &Game, team: &Team) -> Option<String> {
        self.previews.preview(league, game, team).await
    }

    /// Cached ticket links for `team`, optionally for a specific game.
    pub async fn affiliate_links(
        &self,
        team: &Team,
        league: &str,
        game: Option<&Game>,
    ) -> Option<AffiliateLinks> {
        self.tickets.affiliate_links(team, league, game).await
    }

    pub fn previews(&self) -> &GamePreviewEnrichment {
        &self.previews
    }

    pub fn tickets(&self) -> &TicketLinkEnrichment {
        &self.tickets
    }
}

/// Record one upstream call.
pub(crate) fn record_upstream(provider: &str, ok: bool, started: Instant) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::UPSTREAM_DURATION_SECONDS,
        "provider" => provider.to_owned(),
    )
    .record(started.elapsed().as_secs_f64());
}
