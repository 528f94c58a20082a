//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::schedule::parse_schedule;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Resource API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Default and additional languages
    #[serde(default)]
    pub languages: LanguageConfig,

    /// Document store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Collection schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Station batching settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Per-run fan-out settings
    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("API_ENDPOINT") {
            self.api.endpoint = v;
        }
        if let Some(v) = get("TOKEN_URL") {
            self.api.token_url = Some(v);
        }
        if let Some(v) = get("CLIENT_ID") {
            self.api.client_id = v;
        }
        if let Some(v) = get("CLIENT_SECRET") {
            self.api.client_secret = v;
        }
        if let Some(v) = get("STORE_DIR") {
            self.store.root_dir = v;
        }
        if let Some(v) = get("COLLECTION_PREFIX") {
            self.store.collection_prefix = v;
        }
        if let Some(v) = get("JOB_SCHEDULE") {
            self.schedule.cron = v;
        }
        if let Some(v) = get("DEFAULT_LANGUAGE") {
            self.languages.default = v.trim().to_string();
        }
        if let Some(v) = get("LANGUAGES") {
            self.languages.additional = v
                .split(',')
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty())
                .collect();
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(AppError::validation("api.endpoint is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if !self.api.client_id.is_empty() && self.api.client_secret.is_empty() {
            return Err(AppError::validation(
                "api.client_secret is required when api.client_id is set",
            ));
        }
        if self.languages.default.trim().is_empty() {
            return Err(AppError::validation("languages.default is empty"));
        }
        if self.store.collection_prefix.trim().is_empty() {
            return Err(AppError::validation("store.collection_prefix is empty"));
        }
        if self.batch.size == 0 {
            return Err(AppError::validation("batch.size must be > 0"));
        }
        if self.batch.flush_interval_secs == 0 {
            return Err(AppError::validation("batch.flush_interval_secs must be > 0"));
        }
        if self.batch.channel_capacity == 0 {
            return Err(AppError::validation("batch.channel_capacity must be > 0"));
        }
        if self.collector.max_concurrent_locations == Some(0) {
            return Err(AppError::validation(
                "collector.max_concurrent_locations must be > 0 when set",
            ));
        }
        parse_schedule(&self.schedule.cron)?;
        Ok(())
    }
}

/// Resource API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the resource API
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// OAuth2 token endpoint, `{endpoint}/connect/token` when unset
    #[serde(default)]
    pub token_url: Option<String>,

    /// Client credentials; requests are unauthenticated when empty
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    /// Effective token endpoint.
    pub fn token_url(&self) -> String {
        self.token_url.clone().unwrap_or_else(|| {
            format!("{}/connect/token", self.endpoint.trim_end_matches('/'))
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether client credentials are configured.
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            token_url: None,
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Languages requested from the resource API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Canonical language; its fetch defines the entity set
    #[serde(default = "defaults::default_language")]
    pub default: String,

    /// Translations merged into the canonical records
    #[serde(default = "defaults::additional_languages")]
    pub additional: Vec<String>,
}

impl LanguageConfig {
    /// Additional languages without the default and without repeats.
    pub fn others(&self) -> Vec<String> {
        let mut others: Vec<String> = Vec::new();
        for lang in &self.additional {
            if lang != &self.default && !others.contains(lang) {
                others.push(lang.clone());
            }
        }
        others
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            default: defaults::default_language(),
            additional: defaults::additional_languages(),
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of the local JSON-lines store
    #[serde(default = "defaults::store_dir")]
    pub root_dir: String,

    /// Prefix for the location and station collections
    #[serde(default = "defaults::collection_prefix")]
    pub collection_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::store_dir(),
            collection_prefix: defaults::collection_prefix(),
        }
    }
}

/// Collection schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Cron expression, five or six fields
    #[serde(default = "defaults::cron")]
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: defaults::cron(),
        }
    }
}

/// Station batching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pending stations that trigger an immediate flush
    #[serde(default = "defaults::batch_size")]
    pub size: usize,

    /// Maximum age of a pending batch in seconds
    #[serde(default = "defaults::flush_interval")]
    pub flush_interval_secs: u64,

    /// Capacity of the channel between station workers and the aggregator
    #[serde(default = "defaults::channel_capacity")]
    pub channel_capacity: usize,
}

impl BatchConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: defaults::batch_size(),
            flush_interval_secs: defaults::flush_interval(),
            channel_capacity: defaults::channel_capacity(),
        }
    }
}

/// Per-run fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollectorConfig {
    /// Bound on concurrently running location workers, unbounded when unset
    #[serde(default)]
    pub max_concurrent_locations: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // API defaults
    pub fn endpoint() -> String {
        "http://localhost:8080".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        "bikebox-collector/0.1".into()
    }

    // Language defaults
    pub fn default_language() -> String {
        "it".into()
    }
    pub fn additional_languages() -> Vec<String> {
        vec!["en".into(), "de".into(), "lld".into()]
    }

    // Store defaults
    pub fn store_dir() -> String {
        "data".into()
    }
    pub fn collection_prefix() -> String {
        "raw".into()
    }

    pub fn cron() -> String {
        "*/15 * * * *".into()
    }

    // Batch defaults
    pub fn batch_size() -> usize {
        50
    }
    pub fn flush_interval() -> u64 {
        5
    }
    pub fn channel_capacity() -> usize {
        100
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
