//! Builder for configuring enrichment instances

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::preview::{PREVIEW_CACHE_FILE, PREVIEW_DOMAIN, PREVIEW_TTL};
use super::tickets::{TICKETS_CACHE_FILE, TICKETS_DOMAIN, TICKETS_TTL};
use super::{Enrichment, GamePreviewEnrichment, TicketLinkEnrichment};
use crate::cache::{
    CacheStore, Clock, ConcurrencyMode, DEFAULT_PURGE_PROBABILITY, ReadThrough, StoreConfig,
    SystemClock,
};
use crate::providers::{CjClient, CjCredentials, GeminiClient, PreviewProvider, TicketSearch};
use crate::{EnrichError, Result};

/// Cache directory used when none is configured, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "data/cache";

/// Environment variable overriding the default cache directory.
pub const CACHE_DIR_ENV: &str = "COUNTDOWN_ENRICH_CACHE_DIR";

/// Builder for configuring enrichment instances.
pub struct EnrichmentBuilder {
    cache_dir: Option<PathBuf>,
    preview_ttl: Duration,
    tickets_ttl: Duration,
    purge_probability: f64,
    concurrency: ConcurrencyMode,
    clock: Option<Arc<dyn Clock>>,
    gemini_key: Option<String>,
    gemini_model: Option<String>,
    gemini_base_url: Option<String>,
    cj_credentials: Option<CjCredentials>,
    cj_base_url: Option<String>,
    cj_timeout: Option<Duration>,
    preview_provider: Option<Arc<dyn PreviewProvider>>,
    ticket_search: Option<Arc<dyn TicketSearch>>,
}

impl EnrichmentBuilder {
    pub fn new() -> Self {
        Self {
            cache_dir: None,
            preview_ttl: PREVIEW_TTL,
            tickets_ttl: TICKETS_TTL,
            purge_probability: DEFAULT_PURGE_PROBABILITY,
            concurrency: ConcurrencyMode::default(),
            clock: None,
            gemini_key: None,
            gemini_model: None,
            gemini_base_url: None,
            cj_credentials: None,
            cj_base_url: None,
            cj_timeout: None,
            preview_provider: None,
            ticket_search: None,
        }
    }

    /// Directory holding both cache files (default: `data/cache`).
    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Override the preview TTL (default: 24 hours).
    pub fn preview_ttl(mut self, ttl: Duration) -> Self {
        self.preview_ttl = ttl;
        self
    }

    /// Override the ticket-link TTL (default: 7 days).
    pub fn tickets_ttl(mut self, ttl: Duration) -> Self {
        self.tickets_ttl = ttl;
        self
    }

    /// Chance that a cache write also sweeps expired entries (default: 0.05).
    pub fn purge_probability(mut self, p: f64) -> Self {
        self.purge_probability = p;
        self
    }

    /// How concurrent misses for one key behave.
    ///
    /// [`ConcurrencyMode::Coalesced`] also serializes writes to each file.
    pub fn concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency = mode;
        self
    }

    /// Time source for TTL checks and "upcoming" ticket fallback.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Configure the Gemini preview generator.
    pub fn gemini(mut self, api_key: impl Into<String>) -> Self {
        self.gemini_key = Some(api_key.into());
        self
    }

    /// Override the Gemini model (default: `gemini-2.5-flash-lite`).
    pub fn gemini_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = Some(model.into());
        self
    }

    /// Override the Gemini endpoint.
    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_base_url = Some(url.into());
        self
    }

    /// Configure the CJ ticket search.
    pub fn cj(mut self, credentials: CjCredentials) -> Self {
        self.cj_credentials = Some(credentials);
        self
    }

    /// Override the CJ endpoint.
    pub fn cj_base_url(mut self, url: impl Into<String>) -> Self {
        self.cj_base_url = Some(url.into());
        self
    }

    /// Override the CJ request timeout (default: 8 seconds).
    pub fn cj_timeout(mut self, timeout: Duration) -> Self {
        self.cj_timeout = Some(timeout);
        self
    }

    /// Use a custom preview provider instead of Gemini.
    pub fn preview_provider(mut self, provider: Arc<dyn PreviewProvider>) -> Self {
        self.preview_provider = Some(provider);
        self
    }

    /// Use a custom ticket search instead of CJ.
    pub fn ticket_search(mut self, search: Arc<dyn TicketSearch>) -> Self {
        self.ticket_search = Some(search);
        self
    }

    /// Build the enrichment.
    ///
    /// Missing providers are not an error: that domain then always
    /// resolves to `None`.
    pub fn build(self) -> Result<Enrichment> {
        if !(0.0..=1.0).contains(&self.purge_probability) {
            return Err(EnrichError::Configuration(format!(
                "purge probability must be within [0, 1], got {}",
                self.purge_probability
            )));
        }

        let cache_dir = self.cache_dir.clone().unwrap_or_else(|| {
            std::env::var(CACHE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR))
        });
        let clock: Arc<dyn Clock> = self.clock.clone().unwrap_or_else(|| Arc::new(SystemClock));
        let synchronized = self.concurrency == ConcurrencyMode::Coalesced;

        let store_config = |ttl| {
            StoreConfig::new(ttl)
                .purge_probability(self.purge_probability)
                .synchronized(synchronized)
        };

        let preview_store = CacheStore::new(
            PREVIEW_DOMAIN,
            cache_dir.join(PREVIEW_CACHE_FILE),
            store_config(self.preview_ttl),
        )
        .with_clock(clock.clone());
        let tickets_store = CacheStore::new(
            TICKETS_DOMAIN,
            cache_dir.join(TICKETS_CACHE_FILE),
            store_config(self.tickets_ttl),
        )
        .with_clock(clock);

        let preview_provider = self.build_preview_provider()?;
        let ticket_search = self.build_ticket_search()?;

        debug!(
            cache_dir = %cache_dir.display(),
            concurrency = ?self.concurrency,
            has_preview_provider = preview_provider.is_some(),
            has_ticket_search = ticket_search.is_some(),
            "enrichment built"
        );

        Ok(Enrichment::new(
            GamePreviewEnrichment::new(
                ReadThrough::new(preview_store, self.concurrency),
                preview_provider,
            ),
            TicketLinkEnrichment::new(
                ReadThrough::new(tickets_store, self.concurrency),
                ticket_search,
            ),
        ))
    }

    fn build_preview_provider(&self) -> Result<Option<Arc<dyn PreviewProvider>>> {
        if let Some(provider) = &self.preview_provider {
            return Ok(Some(provider.clone()));
        }
        let Some(key) = &self.gemini_key else {
            return Ok(None);
        };
        let mut client = match &self.gemini_base_url {
            Some(url) => GeminiClient::with_base_url(key, url)?,
            None => GeminiClient::new(key)?,
        };
        if let Some(model) = &self.gemini_model {
            client = client.model(model);
        }
        Ok(Some(Arc::new(client)))
    }

    fn build_ticket_search(&self) -> Result<Option<Arc<dyn TicketSearch>>> {
        if let Some(search) = &self.ticket_search {
            return Ok(Some(search.clone()));
        }
        let Some(credentials) = &self.cj_credentials else {
            return Ok(None);
        };
        let client = CjClient::with_base_url(
            credentials.clone(),
            self.cj_base_url
                .as_deref()
                .unwrap_or(crate::providers::cj::DEFAULT_BASE_URL),
            self.cj_timeout
                .unwrap_or(crate::providers::cj::DEFAULT_TIMEOUT),
        )?;
        Ok(Some(Arc::new(client)))
    }
}

impl Default for EnrichmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
