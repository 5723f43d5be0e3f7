//! Configuration infrastructure
//!
//! Configuration is layered with the `config` crate:
//! 1. Built-in defaults (every section is `#[serde(default)]`)
//! 2. Optional file (JSON or TOML, chosen by extension)
//! 3. Environment variables, e.g. `FC_TRACKER_SYNC__PACING__INTERVAL_MS=500`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::info;
use url::Url;

use crate::domain::SourceKind;
use crate::infrastructure::parsing::ScrapingConfig;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "FC_TRACKER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upstream endpoints and HTTP behaviour
    pub upstream: UpstreamConfig,

    /// Sync pipeline policies
    pub sync: SyncConfig,

    /// CSS selectors and marker phrases for scraped pages
    pub scraping: ScrapingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Free Company whose roster the CLI imports when no `--roster` is given
    pub free_company_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Lodestone root, e.g. `https://na.finalfantasyxiv.com/lodestone`
    pub lodestone_base_url: String,

    /// Structured collection API root
    pub collect_api_base_url: String,

    /// Collection site root (roster pages)
    pub collect_site_base_url: String,

    /// Character search API root, used by the `search_api` resolver
    pub search_api_base_url: String,

    /// Content catalog API root
    pub content_api_base_url: String,

    pub user_agent: String,

    /// Per-request timeout enforced by the HTTP client
    pub request_timeout_seconds: u64,

    /// Process-wide request rate limit
    pub max_requests_per_second: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            lodestone_base_url: defaults::LODESTONE_BASE_URL.to_string(),
            collect_api_base_url: defaults::COLLECT_API_BASE_URL.to_string(),
            collect_site_base_url: defaults::COLLECT_SITE_BASE_URL.to_string(),
            search_api_base_url: defaults::COLLECT_API_BASE_URL.to_string(),
            content_api_base_url: defaults::COLLECT_API_BASE_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
        }
    }
}

/// Which resolver implementation maps `name@server` to an external id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    #[default]
    LodestoneSearch,
    SearchApi,
}

/// What happens to owned items with no catalog counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    #[default]
    Silent,
    /// One summary line per content type
    Count,
    /// Summary line plus one line per unmatched name
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStrategy {
    /// Fixed delay between consecutive members
    #[default]
    Fixed,
    /// Governor token bucket: `members_per_minute` with `burst`
    TokenBucket,
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub strategy: PacingStrategy,
    pub interval_ms: u64,
    pub members_per_minute: u32,
    pub burst: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            strategy: PacingStrategy::Fixed,
            interval_ms: defaults::PACING_INTERVAL_MS,
            members_per_minute: defaults::MEMBERS_PER_MINUTE,
            burst: defaults::PACING_BURST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub primary_source: SourceKind,

    /// Tried when the primary fails with a transport or parse error
    pub fallback_source: Option<SourceKind>,

    pub resolver: ResolverKind,

    /// Report "not found" instead of taking the first search result
    pub require_exact_match: bool,

    /// Fetch each owned list separately instead of reading the summary document
    pub per_type_requests: bool,

    pub pacing: PacingConfig,
    pub resolve_timeout_seconds: u64,
    pub fetch_timeout_seconds: u64,
    pub unmatched_policy: UnmatchedPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            primary_source: SourceKind::StructuredApi,
            fallback_source: Some(SourceKind::ScrapedHtml),
            resolver: ResolverKind::default(),
            require_exact_match: false,
            per_type_requests: true,
            pacing: PacingConfig::default(),
            resolve_timeout_seconds: defaults::RESOLVE_TIMEOUT_SECONDS,
            fetch_timeout_seconds: defaults::FETCH_TIMEOUT_SECONDS,
            unmatched_policy: UnmatchedPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub const fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_seconds)
    }

    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files; defaults to the platform data dir
    pub log_directory: Option<PathBuf>,

    /// Daily log files are named `{prefix}.YYYY-MM-DD`
    pub file_name_prefix: String,

    /// Maximum number of log files to keep
    pub max_files: u32,

    /// Per-module level overrides, e.g. `fc_tracker_lib::application::matcher = "debug"`
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_directory: None,
            file_name_prefix: defaults::LOG_FILE_PREFIX.to_string(),
            max_files: defaults::LOG_MAX_FILES,
            module_filters: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional file, then `FC_TRACKER_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Self::environment())
    }

    /// Values stay strings here; serde converts them per field, so long
    /// numeric ids are never rounded through a float.
    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    fn load_with_env(path: Option<&Path>, environment: config::Environment) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder.add_source(environment).build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("upstream.lodestone_base_url", &self.upstream.lodestone_base_url),
            ("upstream.collect_api_base_url", &self.upstream.collect_api_base_url),
            ("upstream.collect_site_base_url", &self.upstream.collect_site_base_url),
            ("upstream.search_api_base_url", &self.upstream.search_api_base_url),
            ("upstream.content_api_base_url", &self.upstream.content_api_base_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::validation(format!("{name} must not be empty")));
            }
            Url::parse(value).map_err(|e| ConfigError::validation(format!("{name} is not a valid URL: {e}")))?;
        }

        if self.upstream.request_timeout_seconds == 0 {
            return Err(ConfigError::validation("upstream.request_timeout_seconds must be greater than 0"));
        }
        if self.upstream.max_requests_per_second == 0 {
            return Err(ConfigError::validation("upstream.max_requests_per_second must be greater than 0"));
        }
        if self.sync.resolve_timeout_seconds == 0 || self.sync.fetch_timeout_seconds == 0 {
            return Err(ConfigError::validation("sync timeouts must be greater than 0"));
        }
        if self.sync.fallback_source == Some(self.sync.primary_source) {
            return Err(ConfigError::validation(format!(
                "sync.fallback_source must differ from the primary source ({})",
                self.sync.primary_source
            )));
        }
        if self.sync.pacing.strategy == PacingStrategy::TokenBucket
            && (self.sync.pacing.members_per_minute == 0 || self.sync.pacing.burst == 0)
        {
            return Err(ConfigError::validation(
                "token bucket pacing needs members_per_minute and burst greater than 0",
            ));
        }

        Ok(())
    }
}

/// Locates and persists the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the platform default location (`<config dir>/fc-tracker/config.json`)
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);
        Ok(Self::with_path(config_dir.join("config.json")))
    }

    pub const fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Effective configuration; a missing file means defaults plus environment
    pub fn load(&self) -> Result<AppConfig> {
        let path = self.config_path.exists().then_some(self.config_path.as_path());
        let config = AppConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", self.config_path))?;
        if path.is_some() {
            info!("Loaded configuration from: {:?}", self.config_path);
        } else {
            info!("No configuration file at {:?}, using defaults", self.config_path);
        }
        Ok(config)
    }

    /// Save configuration to file as pretty JSON
    pub async fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "fc-tracker";

    pub const LODESTONE_BASE_URL: &str = "https://na.finalfantasyxiv.com/lodestone";
    pub const COLLECT_API_BASE_URL: &str = "https://ffxivcollect.com/api";
    pub const COLLECT_SITE_BASE_URL: &str = "https://ffxivcollect.com";
    pub const USER_AGENT: &str = concat!("fc-tracker/", env!("CARGO_PKG_VERSION"));

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 4;

    /// Delay between members during a guild sync
    pub const PACING_INTERVAL_MS: u64 = 2000;
    pub const MEMBERS_PER_MINUTE: u32 = 30;
    pub const PACING_BURST: u32 = 1;

    pub const RESOLVE_TIMEOUT_SECONDS: u64 = 20;
    pub const FETCH_TIMEOUT_SECONDS: u64 = 45;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_FILE_PREFIX: &str = "fc-tracker.log";
    pub const LOG_MAX_FILES: u32 = 7;
}
