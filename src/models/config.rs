//! Application configuration structures.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Registry API settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Disease-extraction settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Document store settings
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.registry.base_url.trim().is_empty() {
            return Err(AppError::validation("registry.base_url is empty"));
        }
        if self.registry.user_agent.trim().is_empty() {
            return Err(AppError::validation("registry.user_agent is empty"));
        }
        if self.registry.timeout_secs == 0 {
            return Err(AppError::validation("registry.timeout_secs must be > 0"));
        }
        if self.registry.page_size == 0 {
            return Err(AppError::validation("registry.page_size must be > 0"));
        }
        if self.enrichment.max_workers == 0 {
            return Err(AppError::validation("enrichment.max_workers must be > 0"));
        }
        if self.store.max_concurrent_writes == 0 {
            return Err(AppError::validation(
                "store.max_concurrent_writes must be > 0",
            ));
        }
        Ok(())
    }
}

/// Registry API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between successive page requests in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Number of records requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_delay_ms: defaults::page_delay(),
            page_size: defaults::page_size(),
        }
    }
}

/// Disease-extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Upper bound on concurrent extraction workers
    #[serde(default = "defaults::max_workers")]
    pub max_workers: usize,

    /// Chat-completions endpoint of the extraction backend
    #[serde(default = "defaults::extraction_endpoint")]
    pub endpoint: String,

    /// Model name sent to the extraction backend
    #[serde(default = "defaults::extraction_model")]
    pub model: String,

    /// Request timeout in seconds for extraction calls
    #[serde(default = "defaults::extraction_timeout")]
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_workers: defaults::max_workers(),
            endpoint: defaults::extraction_endpoint(),
            model: defaults::extraction_model(),
            timeout_secs: defaults::extraction_timeout(),
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URI; the `MONGO_URI` environment variable wins over this
    #[serde(default = "defaults::store_uri")]
    pub uri: String,

    /// Target database name
    #[serde(default = "defaults::store_database")]
    pub database: String,

    /// Target collection name
    #[serde(default = "defaults::store_collection")]
    pub collection: String,

    /// Concurrent writes per batch upsert
    #[serde(default = "defaults::max_concurrent_writes")]
    pub max_concurrent_writes: usize,
}

impl StoreConfig {
    /// Connection URI, honoring the `MONGO_URI` environment override.
    pub fn resolved_uri(&self) -> String {
        env::var("MONGO_URI").unwrap_or_else(|_| self.uri.clone())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: defaults::store_uri(),
            database: defaults::store_database(),
            collection: defaults::store_collection(),
            max_concurrent_writes: defaults::max_concurrent_writes(),
        }
    }
}

mod defaults {
    // Registry defaults
    pub fn base_url() -> String {
        "https://clinicaltrials.gov/api/v2".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; trial-ingest/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_delay() -> u64 {
        100
    }
    pub fn page_size() -> u32 {
        500
    }

    // Enrichment defaults
    pub fn max_workers() -> usize {
        500
    }
    pub fn extraction_endpoint() -> String {
        "https://api.openai.com/v1/chat/completions".into()
    }
    pub fn extraction_model() -> String {
        "gpt-4".into()
    }
    pub fn extraction_timeout() -> u64 {
        60
    }

    // Store defaults
    pub fn store_uri() -> String {
        "mongodb://mongo:27017".into()
    }
    pub fn store_database() -> String {
        "clinical_trials".into()
    }
    pub fn store_collection() -> String {
        "studies".into()
    }
    pub fn max_concurrent_writes() -> usize {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.registry.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.enrichment.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_base_url() {
        let mut config = Config::default();
        config.registry.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_toml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[registry]\npage_size = 25").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.registry.page_size, 25);
        assert_eq!(config.store.database, "clinical_trials");
        assert_eq!(config.enrichment.max_workers, 500);
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.registry.page_size, 500);
    }
}
