//! Configuration for the stock desk

use crate::error::{DeskError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default backend location
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

const ENV_API_URL: &str = "STOCK_DESK_API_URL";
const ENV_TIMEOUT_SECS: &str = "STOCK_DESK_TIMEOUT_SECS";

/// Configuration for the desk controller and backend client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Base URL of the analysis backend, including the `/api` prefix
    pub api_base_url: String,

    /// Client-side request timeout. `None` waits for the backend as long as
    /// it takes; full analyses routinely run for minutes.
    pub request_timeout: Option<Duration>,

    /// How long a successful analysis counts as fresh
    pub freshness_window: Duration,

    /// Minimum spacing between two fetch attempts of one category
    pub debounce_window: Duration,

    /// Lifetime of cached price series
    pub stock_data_ttl: Duration,

    /// Maximum number of transcript messages kept
    pub max_transcript: usize,

    /// First system message of a new transcript, empty to disable
    pub welcome_message: String,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: None,
            freshness_window: Duration::from_secs(600),  // 10 minutes
            debounce_window: Duration::from_secs(1),
            stock_data_ttl: Duration::from_secs(60),
            max_transcript: 200,
            welcome_message: "Welcome to Stock Analyzer! Enter a ticker symbol to begin analysis."
                .to_string(),
        }
    }
}

impl DeskConfig {
    /// Create a new configuration builder
    pub fn builder() -> DeskConfigBuilder {
        DeskConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DeskError::Config(format!(
                "api_base_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.debounce_window.is_zero() {
            return Err(DeskError::Config(
                "debounce_window must be greater than 0".to_string(),
            ));
        }

        if self.max_transcript == 0 {
            return Err(DeskError::Config(
                "max_transcript must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed base URL with a trailing slash so relative joins keep `/api`
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.api_base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Url::parse(&raw)?)
    }
}

/// Builder for DeskConfig
#[derive(Debug, Default)]
pub struct DeskConfigBuilder {
    api_base_url: Option<String>,
    request_timeout: Option<Duration>,
    freshness_window: Option<Duration>,
    debounce_window: Option<Duration>,
    stock_data_ttl: Option<Duration>,
    max_transcript: Option<usize>,
    welcome_message: Option<String>,
}

impl DeskConfigBuilder {
    /// Set the backend base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set a client-side request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the freshness window
    pub fn freshness_window(mut self, duration: Duration) -> Self {
        self.freshness_window = Some(duration);
        self
    }

    /// Set the debounce window
    pub fn debounce_window(mut self, duration: Duration) -> Self {
        self.debounce_window = Some(duration);
        self
    }

    /// Set the price series cache TTL
    pub fn stock_data_ttl(mut self, duration: Duration) -> Self {
        self.stock_data_ttl = Some(duration);
        self
    }

    /// Set the transcript size limit
    pub fn max_transcript(mut self, max: usize) -> Self {
        self.max_transcript = Some(max);
        self
    }

    /// Set the welcome message
    pub fn welcome_message(mut self, msg: impl Into<String>) -> Self {
        self.welcome_message = Some(msg.into());
        self
    }

    /// Load overrides from `STOCK_DESK_API_URL` and `STOCK_DESK_TIMEOUT_SECS`
    ///
    /// Values already set on the builder win over the environment.
    pub fn with_env(mut self) -> Self {
        if self.api_base_url.is_none() {
            if let Ok(url) = std::env::var(ENV_API_URL) {
                self.api_base_url = Some(url);
            }
        }
        if self.request_timeout.is_none() {
            if let Some(secs) = std::env::var(ENV_TIMEOUT_SECS)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
            {
                self.request_timeout = Some(Duration::from_secs(secs));
            }
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DeskConfig> {
        let defaults = DeskConfig::default();

        let config = DeskConfig {
            api_base_url: self.api_base_url.unwrap_or(defaults.api_base_url),
            request_timeout: self.request_timeout.or(defaults.request_timeout),
            freshness_window: self.freshness_window.unwrap_or(defaults.freshness_window),
            debounce_window: self.debounce_window.unwrap_or(defaults.debounce_window),
            stock_data_ttl: self.stock_data_ttl.unwrap_or(defaults.stock_data_ttl),
            max_transcript: self.max_transcript.unwrap_or(defaults.max_transcript),
            welcome_message: self.welcome_message.unwrap_or(defaults.welcome_message),
        };

        config.validate()?;
        Ok(config)
    }
}
