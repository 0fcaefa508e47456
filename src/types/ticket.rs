//! Affiliate ticket search types.

use serde::{Deserialize, Serialize};

/// Search sent to a ticket upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketQuery {
    /// Name variants of both teams; upstream matches any of them.
    pub keywords: Vec<String>,
    pub limit: u32,
}

/// One event listing returned by a ticket upstream.
///
/// Transient: only the winning candidate's `click_url` is ever cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCandidate {
    pub id: String,
    pub title: String,
    /// Pipe-delimited, e.g. `"Edmonton Oilers|Vancouver Canucks"`.
    pub performers: String,
    /// e.g. `"Sports | Baseball | Professional (MLB)"`.
    pub category_name: String,
    /// ISO 8601 event start.
    pub event_start_date: String,
    pub location_name: Option<String>,
    pub click_url: String,
}

/// Links rendered next to a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickets: Option<String>,
}
