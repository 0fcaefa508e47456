//! Game-preview enrichment.
//!
//! Keyed by game id, cached for 24 hours, and negatives are cached too:
//! when the generator fails (or no key is configured) the game is
//! remembered as "no preview" for the rest of the TTL. Callers must treat
//! `None` as a stable answer, not as "try again soon".

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::record_upstream;
use crate::cache::{NegativeCaching, ReadThrough};
use crate::providers::PreviewProvider;
use crate::types::{Game, Team};

/// Preview TTL: 24 hours.
pub const PREVIEW_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// File name of the preview cache inside the cache directory.
pub const PREVIEW_CACHE_FILE: &str = "gemini-previews.json";

/// Metric/log domain label.
pub const PREVIEW_DOMAIN: &str = "preview";

/// Cached AI-generated game previews.
pub struct GamePreviewEnrichment {
    cache: ReadThrough<String>,
    provider: Option<Arc<dyn PreviewProvider>>,
}

impl GamePreviewEnrichment {
    pub fn new(cache: ReadThrough<String>, provider: Option<Arc<dyn PreviewProvider>>) -> Self {
        Self { cache, provider }
    }

    pub fn cache(&self) -> &ReadThrough<String> {
        &self.cache
    }

    /// Preview for `game` as seen from `team`'s page.
    ///
    /// Never fails. `None` means "no preview", whether the generator said
    /// nothing or was unreachable.
    pub async fn preview(&self, league: &str, game: &Game, team: &Team) -> Option<String> {
        self.cache
            .get_or_compute(&game.id, NegativeCaching::Cache, || {
                self.generate(league, game, team)
            })
            .await
    }

    /// Call the generator directly, bypassing the cache.
    pub async fn generate(&self, league: &str, game: &Game, team: &Team) -> Option<String> {
        let Some(provider) = &self.provider else {
            debug!(game_id = %game.id, "no preview provider configured");
            return None;
        };

        let prompt = build_prompt(league, game, team);
        let started = Instant::now();
        let result = provider.generate(&prompt).await;
        record_upstream(provider.name(), result.is_ok(), started);

        match result {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    game_id = %game.id,
                    transient = e.is_transient(),
                    error = %e,
                    "preview generation failed"
                );
                None
            }
        }
    }
}

/// Prompt for a bullet-point matchup preview.
pub fn build_prompt(league: &str, game: &Game, team: &Team) -> String {
    let opponent = game.opponent_of(team);
    let opponent_name = if opponent.full_name.is_empty() {
        "TBD"
    } else {
        opponent.full_name.as_str()
    };
    let game_date = format_game_date(&game.time);

    format!(
        "You are a bullet point game summarizer. Tell us about any exciting storylines in this matchup.
\t
IMPORTANT:
- Respond with only bullet points. Do not include any preamble before the bullets.
- Keep it to 3 bullet points or less
- Use a casual short tone, like someone telling their buddy about the game
- The point is to get the reader pumped about the game
- Avoid the use of em dashes

<league>{league}</league>
<matchup>{} vs {opponent_name}</matchup>
<game-date>{game_date}</game-date>",
        team.full_name
    )
}

/// `"October 19, 2026"`, or `"Date TBD"` when `time` is empty or unparsable.
pub fn format_game_date(time: &str) -> String {
    match crate::types::parse_instant(time) {
        Some(t) => t.format("%B %-d, %Y").to_string(),
        None => "Date TBD".to_string(),
    }
}
