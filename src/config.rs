//! Configuration loading for the `enrich` CLI.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag; must exist)
//! 2. `~/.countdown-enrich/config.toml` (user)
//! 3. `/etc/countdown-enrich/config.toml` (system)
//! 4. built-in defaults
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.countdown-enrich/secrets.toml` (user, must be 0600)
//! 2. `/etc/countdown-enrich/secrets.toml` (system, must be 0600)
//!
//! and fall back to the environment (`GOOGLE_AI_API_KEY`, `CJ_*`).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{ConcurrencyMode, DEFAULT_PURGE_PROBABILITY};
use crate::enrich::preview::PREVIEW_TTL;
use crate::enrich::tickets::TICKETS_TTL;
use crate::enrich::{DEFAULT_CACHE_DIR, EnrichmentBuilder};
use crate::providers::CjCredentials;
use crate::{EnrichError, Result};

/// Environment variable holding the Gemini API key.
pub const GEMINI_KEY_ENV: &str = "GOOGLE_AI_API_KEY";

/// CLI configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub cj: CjConfig,
}

/// Cache file locations and policies.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding both cache files (default: `data/cache`).
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Preview TTL in seconds (default: 86400).
    #[serde(default = "default_preview_ttl")]
    pub preview_ttl_secs: u64,
    /// Ticket-link TTL in seconds (default: 604800).
    #[serde(default = "default_tickets_ttl")]
    pub tickets_ttl_secs: u64,
    /// Chance that a write also sweeps expired entries (default: 0.05).
    #[serde(default = "default_purge_probability")]
    pub purge_probability: f64,
    /// `"unsynchronized"` (default) or `"coalesced"`.
    #[serde(default)]
    pub concurrency: ConcurrencyMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            preview_ttl_secs: default_preview_ttl(),
            tickets_ttl_secs: default_tickets_ttl(),
            purge_probability: default_purge_probability(),
            concurrency: ConcurrencyMode::default(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_preview_ttl() -> u64 {
    PREVIEW_TTL.as_secs()
}

fn default_tickets_ttl() -> u64 {
    TICKETS_TTL.as_secs()
}

fn default_purge_probability() -> f64 {
    DEFAULT_PURGE_PROBABILITY
}

/// Gemini endpoint settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// CJ endpoint settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CjConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 8).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Secrets configuration (API keys and affiliate credentials).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub gemini: Option<ApiKeySecret>,
    #[serde(default)]
    pub cj: Option<CjCredentials>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Config {
    /// Load configuration from the standard locations, or defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EnrichError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            EnrichError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path, `None` when no file exists.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(EnrichError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".countdown-enrich").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/countdown-enrich/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Builder pre-populated from this config and `secrets`.
    pub fn builder(&self, secrets: &Secrets) -> EnrichmentBuilder {
        let mut builder = EnrichmentBuilder::new()
            .cache_dir(&self.cache.dir)
            .preview_ttl(Duration::from_secs(self.cache.preview_ttl_secs))
            .tickets_ttl(Duration::from_secs(self.cache.tickets_ttl_secs))
            .purge_probability(self.cache.purge_probability)
            .concurrency(self.cache.concurrency);

        if let Some(key) = secrets.gemini_key() {
            builder = builder.gemini(key);
        }
        if let Some(model) = &self.gemini.model {
            builder = builder.gemini_model(model);
        }
        if let Some(url) = &self.gemini.base_url {
            builder = builder.gemini_base_url(url);
        }

        if let Some(credentials) = secrets.cj_credentials() {
            builder = builder.cj(credentials);
        }
        if let Some(url) = &self.cj.base_url {
            builder = builder.cj_base_url(url);
        }
        if let Some(secs) = self.cj.timeout_secs {
            builder = builder.cj_timeout(Duration::from_secs(secs));
        }
        builder
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (env vars still apply).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".countdown-enrich").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/countdown-enrich/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EnrichError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            EnrichError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            EnrichError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(EnrichError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Gemini key from the secrets file, falling back to `GOOGLE_AI_API_KEY`.
    pub fn gemini_key(&self) -> Option<String> {
        self.gemini
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(GEMINI_KEY_ENV).ok())
            .filter(|k| !k.is_empty())
    }

    /// CJ credentials from the secrets file, falling back to the `CJ_*` variables.
    pub fn cj_credentials(&self) -> Option<CjCredentials> {
        self.cj.clone().or_else(CjCredentials::from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.cache.dir, PathBuf::from("data/cache"));
        assert_eq!(config.cache.preview_ttl_secs, 86_400);
        assert_eq!(config.cache.tickets_ttl_secs, 604_800);
        assert_eq!(config.cache.purge_probability, 0.05);
        assert_eq!(config.cache.concurrency, ConcurrencyMode::Unsynchronized);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [cache]
            dir = "/var/cache/countdown"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.dir, PathBuf::from("/var/cache/countdown"));
        // Defaults preserved
        assert_eq!(config.cache.preview_ttl_secs, 86_400);
        assert!(config.gemini.model.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [cache]
            dir = "cache"
            preview_ttl_secs = 3600
            tickets_ttl_secs = 7200
            purge_probability = 0.25
            concurrency = "coalesced"

            [gemini]
            model = "gemini-2.5-flash"
            base_url = "http://localhost:9000"

            [cj]
            base_url = "http://localhost:9001/query"
            timeout_secs = 3
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.preview_ttl_secs, 3600);
        assert_eq!(config.cache.tickets_ttl_secs, 7200);
        assert_eq!(config.cache.purge_probability, 0.25);
        assert_eq!(config.cache.concurrency, ConcurrencyMode::Coalesced);
        assert_eq!(config.gemini.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.cj.timeout_secs, Some(3));
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [gemini]
            api_key = "g-test-key"

            [cj]
            company_id = "1"
            website_pid = "2"
            partner_id = "3"
            access_token = "tok"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.gemini_key(), Some("g-test-key".to_string()));
        let cj = secrets.cj_credentials().unwrap();
        assert_eq!(cj.partner_id, "3");
        assert_eq!(cj.access_token, "tok");
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\npurge_probability = 0.5\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.purge_probability, 0.5);
    }

    #[test]
    fn builder_from_config_builds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.dir = dir.path().to_path_buf();
        config.cache.preview_ttl_secs = 60;
        let enrichment = config.builder(&Secrets::default()).build().unwrap();
        assert_eq!(
            enrichment.previews().cache().store().ttl(),
            Duration::from_secs(60)
        );
    }
}
