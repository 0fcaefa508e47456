//! Upstream clients for the enrichment domains.
//!
//! - [`GeminiClient`]: AI text generation with web-search grounding
//!   (game previews).
//! - [`CjClient`]: CJ affiliate GraphQL search over TicketNetwork
//!   listings (ticket links).

pub mod cj;
pub mod gemini;
pub mod traits;

pub use cj::{CjClient, CjCredentials};
pub use gemini::GeminiClient;
pub use traits::{PreviewProvider, TicketSearch};

use std::time::Duration;

use crate::{EnrichError, Result};

/// Map a non-success HTTP status to an error.
pub(crate) fn check_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();

    if status.is_success() {
        return Ok(());
    }

    match status.as_u16() {
        401 | 403 => Err(EnrichError::AuthenticationFailed),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(EnrichError::RateLimited { retry_after })
        }
        code => Err(EnrichError::Api {
            status: code,
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }),
    }
}
