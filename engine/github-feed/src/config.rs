use anyhow::Context;
use event_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the config file to load
pub const CONFIG_PATH_ENV: &str = "GITHUB_EVENTS_CONFIG";

/// Config file looked up when `GITHUB_EVENTS_CONFIG` is unset (any supported extension)
pub const DEFAULT_CONFIG_FILE: &str = "github-events";

/// Prefix for `GITHUB_EVENTS__SECTION__KEY` overrides
pub const ENV_PREFIX: &str = "GITHUB_EVENTS";

/// Configuration for the GitHub events ingestion service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Upstream feed configuration
    pub feed: FeedConfig,

    /// Event store configuration
    pub store: StoreConfig,

    /// Scheduler configuration
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// API root; events are read from `{base_url}/events`
    pub base_url: String,

    /// Records requested per page
    pub per_page: u32,

    /// Highest page number fetched per ingestion run
    pub page_budget: u32,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Pause between successful page fetches in milliseconds
    pub page_delay_ms: u64,

    /// User-Agent header (GitHub rejects requests without one)
    pub user_agent: String,

    /// Optional token sent as `Authorization: Bearer ...`
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between ingestion ticks in milliseconds
    pub interval_ms: u64,

    /// Run the first tick immediately instead of one interval after start
    pub run_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json, compact)
    pub format: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            per_page: 100,
            page_budget: 1,
            request_timeout_secs: 10,
            page_delay_ms: 1_000,
            user_agent: concat!("github-feed/", env!("CARGO_PKG_VERSION")).to_string(),
            api_token: None,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000, run_on_start: false }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl FeedConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ServiceConfig {
    /// Load configuration from the config file named by `GITHUB_EVENTS_CONFIG`
    /// (default `github-events.*`, optional) and environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load(Some(&path))
    }

    /// Load configuration: defaults, then `file` if it exists, then
    /// `GITHUB_EVENTS__*` variables, then `DATABASE_URL` and `GITHUB_TOKEN`
    pub fn load(file: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(file) = file {
            builder = builder.add_source(config::File::with_name(file).required(false));
        }

        let mut config: ServiceConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.store.url = db_url;
        }

        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                config.feed.api_token = Some(token);
            }
        }

        config.validate().map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.feed.per_page == 0 {
            return Err("feed.per_page must be greater than 0".to_string());
        }

        if self.feed.page_budget == 0 {
            return Err("feed.page_budget must be greater than 0".to_string());
        }

        if self.feed.request_timeout_secs == 0 {
            return Err("feed.request_timeout_secs must be greater than 0".to_string());
        }

        if self.scheduler.interval_ms == 0 {
            return Err("scheduler.interval_ms must be greater than 0".to_string());
        }

        self.store.validate()
    }
}
