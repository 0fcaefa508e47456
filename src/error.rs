//! countdown-enrich error types

use std::time::Duration;

/// Errors raised by upstream providers and configuration loading.
///
/// None of these ever reach a caller of [`Enrichment`](crate::Enrichment):
/// the enrichments fold them into a `None` result before the cache sees
/// them.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("request timed out")]
    Timeout,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("empty response from provider")]
    EmptyResponse,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EnrichError {
    /// Whether the failure is likely to clear up on its own.
    ///
    /// Only used for log levels; nothing is retried, because a failed
    /// lookup is cached (previews) or simply re-queried on the next page
    /// view (tickets).
    pub fn is_transient(&self) -> bool {
        match self {
            EnrichError::Http(_) | EnrichError::RateLimited { .. } | EnrichError::Timeout => true,
            EnrichError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for EnrichError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EnrichError::Timeout
        } else {
            EnrichError::Http(err.to_string())
        }
    }
}

/// Result type alias for countdown-enrich operations
pub type Result<T> = std::result::Result<T, EnrichError>;
