//! Upstream provider traits.
//!
//! One trait per upstream capability, so the enrichments can be wired to
//! the real HTTP clients in production and to in-process fakes in tests.
//!
//! Implementations report failures through [`Result`]; the enrichments
//! are the ones that turn an error into "nothing available". A provider
//! should never retry internally: every upstream call on a cache miss is
//! a paid or rate-limited call.

use async_trait::async_trait;

use crate::Result;
use crate::types::{TicketCandidate, TicketQuery};

// ============================================================================
// Preview Provider
// ============================================================================

/// Generates a short text preview from a prompt.
#[async_trait]
pub trait PreviewProvider: Send + Sync {
    /// Provider name for logging and metrics.
    fn name(&self) -> &str;

    /// Generate text for `prompt`.
    ///
    /// Returns `EmptyResponse` when the upstream answered without text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// Ticket Search
// ============================================================================

/// Searches an affiliate network for event listings.
#[async_trait]
pub trait TicketSearch: Send + Sync {
    /// Provider name for logging and metrics.
    fn name(&self) -> &str;

    /// Listings matching any of the query keywords.
    ///
    /// Rows the upstream returns incomplete are dropped, not reported.
    async fn search(&self, query: &TicketQuery) -> Result<Vec<TicketCandidate>>;
}
