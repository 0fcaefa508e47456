//! Ticket-link enrichment.
//!
//! Keyed by `team-slug|YYYY-MM-DD`, cached for 7 days, and negatives are
//! NOT cached: a game without a usable listing re-queries the affiliate
//! network on every page view, so inventory that appears later is picked
//! up immediately. This is the opposite trade-off from previews.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::record_upstream;
use crate::cache::{Clock, NegativeCaching, ReadThrough};
use crate::providers::TicketSearch;
use crate::types::{
    AffiliateLinks, Game, Team, TicketCandidate, TicketQuery, parse_instant, truncate_chars,
};

/// Ticket-link TTL: 7 days.
pub const TICKETS_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// File name of the ticket cache inside the cache directory.
pub const TICKETS_CACHE_FILE: &str = "cj-tickets.json";

/// Metric/log domain label.
pub const TICKETS_DOMAIN: &str = "tickets";

/// Listings requested per search.
pub const SEARCH_LIMIT: u32 = 100;

/// Cached affiliate ticket links.
pub struct TicketLinkEnrichment {
    cache: ReadThrough<String>,
    search: Option<Arc<dyn TicketSearch>>,
}

impl TicketLinkEnrichment {
    pub fn new(cache: ReadThrough<String>, search: Option<Arc<dyn TicketSearch>>) -> Self {
        Self { cache, search }
    }

    pub fn cache(&self) -> &ReadThrough<String> {
        &self.cache
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        self.cache.store().clock()
    }

    /// Affiliate links for `team`'s page, optionally for a specific game.
    ///
    /// `None` when no ticket link could be resolved.
    pub async fn affiliate_links(
        &self,
        team: &Team,
        league: &str,
        game: Option<&Game>,
    ) -> Option<AffiliateLinks> {
        self.ticket_link(team, league, game)
            .await
            .map(|url| AffiliateLinks { tickets: Some(url) })
    }

    /// Click-through URL for `game` (or the next upcoming game).
    ///
    /// Only dated games go through the cache. Without a date there is no
    /// key to cache under, so the lookup always goes upstream and falls
    /// back to the next upcoming listing.
    pub async fn ticket_link(&self, team: &Team, league: &str, game: Option<&Game>) -> Option<String> {
        let opponent = game.map(|g| g.opponent_of(team));
        let game_date = game.and_then(Game::date_key);

        match game_date {
            Some(date) => {
                let key = cache_key(&team.full_name, date);
                self.cache
                    .get_or_compute(&key, NegativeCaching::Skip, || {
                        self.resolve(team, opponent, league, Some(date))
                    })
                    .await
            }
            None => self.resolve(team, opponent, league, None).await,
        }
    }

    /// Search, filter and rank, bypassing the cache.
    pub async fn resolve(
        &self,
        team: &Team,
        opponent: Option<&Team>,
        league: &str,
        game_date: Option<&str>,
    ) -> Option<String> {
        let query = TicketQuery {
            keywords: search_keywords(team, opponent),
            limit: SEARCH_LIMIT,
        };
        let candidates = filter_candidates(self.search(&query).await, league);
        let link = find_game_ticket_link(&candidates, game_date, self.clock().now());
        if link.is_none() {
            debug!(team = %team.full_name, league, game_date, candidates = candidates.len(), "no ticket link");
        }
        link
    }

    /// Upstream search with failures folded into "no candidates".
    async fn search(&self, query: &TicketQuery) -> Vec<TicketCandidate> {
        let Some(search) = &self.search else {
            debug!("no ticket search provider configured");
            return Vec::new();
        };

        let started = Instant::now();
        let result = search.search(query).await;
        record_upstream(search.name(), result.is_ok(), started);

        result.unwrap_or_else(|e| {
            warn!(
                provider = search.name(),
                transient = e.is_transient(),
                error = %e,
                "ticket search failed"
            );
            Vec::new()
        })
    }
}

/// Lowercased full name with each whitespace run replaced by `-`.
pub fn team_slug(full_name: &str) -> String {
    let mut slug = String::with_capacity(full_name.len());
    let mut in_space = false;
    for c in full_name.chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
        } else {
            slug.extend(c.to_lowercase());
            in_space = false;
        }
    }
    slug
}

/// `team-slug|YYYY-MM-DD`.
pub fn cache_key(team_full_name: &str, game_date: &str) -> String {
    format!(
        "{}|{}",
        team_slug(team_full_name),
        truncate_chars(game_date, 10)
    )
}

/// Full and informal names of both teams.
///
/// The informal names cover listings that use a different name than the
/// schedule does (e.g. "Athletics").
pub fn search_keywords(team: &Team, opponent: Option<&Team>) -> Vec<String> {
    let mut keywords = vec![team.full_name.clone(), team.nick_name.clone()];
    if let Some(opponent) = opponent {
        keywords.push(opponent.full_name.clone());
        keywords.push(opponent.nick_name.clone());
    }
    keywords
}

/// Substring of TicketNetwork's `categoryName` that identifies a league.
pub fn league_category(league: &str) -> Option<&'static str> {
    match league.to_ascii_uppercase().as_str() {
        "NFL" => Some("NFL"),
        "MLB" => Some("MLB"),
        "NBA" => Some("NBA"),
        "NHL" => Some("NHL"),
        "WNBA" => Some("WNBA"),
        "MLS" => Some("MLS"),
        _ => None,
    }
}

/// Whether `performers` lists exactly two teams.
///
/// Season-ticket packages list one performer (or none) and are excluded.
pub fn is_head_to_head(performers: &str) -> bool {
    let mut parts = performers.split('|');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(a), Some(b), None) if !a.trim().is_empty() && !b.trim().is_empty()
    )
}

/// Keep listings in the right league that are single games.
///
/// Leagues without a known category skip the league check.
pub fn filter_candidates(candidates: Vec<TicketCandidate>, league: &str) -> Vec<TicketCandidate> {
    let category = league_category(league);
    candidates
        .into_iter()
        .filter(|c| category.is_none_or(|cat| c.category_name.contains(cat)))
        .filter(|c| is_head_to_head(&c.performers))
        .collect()
}

/// Pick the listing for `game_date`.
///
/// Candidates are ordered by start date. The first one on the same day
/// wins; otherwise the first one strictly after `now`; otherwise none.
pub fn find_game_ticket_link(
    candidates: &[TicketCandidate],
    game_date: Option<&str>,
    now: DateTime<Utc>,
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let mut sorted: Vec<(&TicketCandidate, Option<DateTime<Utc>>)> = candidates
        .iter()
        .map(|c| (c, parse_instant(&c.event_start_date)))
        .collect();
    // unparsable dates sort last
    sorted.sort_by_key(|(_, starts)| (starts.is_none(), *starts));

    if let Some(date) = game_date {
        let day = truncate_chars(date, 10);
        if let Some((c, _)) = sorted
            .iter()
            .find(|(c, _)| truncate_chars(&c.event_start_date, 10) == day)
        {
            return Some(c.click_url.clone());
        }
    }

    sorted
        .iter()
        .find(|(_, starts)| starts.is_some_and(|t| t > now))
        .map(|(c, _)| c.click_url.clone())
}
