//! The unified team/game shape produced by the per-league schedule mappers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team as every league mapper emits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: u32,
    /// Informal name, e.g. "Chiefs" or "Athletics".
    pub nick_name: String,
    /// Full name, e.g. "Kansas City Chiefs".
    pub full_name: String,
    pub abbreviation: String,
    #[serde(default)]
    pub primary_color: String,
    #[serde(default)]
    pub secondary_color: String,
}

impl Team {
    /// Create a team with the fields the enrichments read; colours empty.
    pub fn new(
        id: u32,
        full_name: impl Into<String>,
        nick_name: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Self {
        Self {
            id,
            nick_name: nick_name.into(),
            full_name: full_name.into(),
            abbreviation: abbreviation.into(),
            primary_color: String::new(),
            secondary_color: String::new(),
        }
    }
}

/// A scheduled game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Upstream game identifier; also the preview cache key.
    pub id: String,
    /// ISO 8601 start time. Empty when the schedule has no time yet.
    #[serde(default)]
    pub time: String,
    pub home_team: Team,
    pub away_team: Team,
}

impl Game {
    /// The side of the game that is not `team` (matched on abbreviation).
    pub fn opponent_of(&self, team: &Team) -> &Team {
        if self.home_team.abbreviation == team.abbreviation {
            &self.away_team
        } else {
            &self.home_team
        }
    }

    /// Start time, if `time` parses.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.time)
    }

    /// `YYYY-MM-DD` prefix of `time`, or `None` when there is no time.
    pub fn date_key(&self) -> Option<&str> {
        if self.time.is_empty() {
            None
        } else {
            Some(truncate_chars(&self.time, 10))
        }
    }
}

/// Parse the timestamp shapes upstream schedules and affiliate feeds use.
///
/// Accepts RFC 3339 (`2026-10-19T17:00:00Z`, `...-04:00`), naive
/// date-times (`2026-10-19T17:00:00`, read as UTC) and bare dates
/// (`2026-10-19`, midnight UTC).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// First `n` characters of `s` (all of `s` if shorter).
pub fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
