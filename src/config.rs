use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    pub api: ApiSection,
    #[serde(default)]
    pub sync: Option<SyncSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSection {
    /// Base URL of the telemetry backend.
    pub base_url: String,
    /// Base URL of the predictions service. Predictions are skipped when unset.
    pub predictions_base_url: Option<String>,
    /// Bearer token attached to every request.
    pub token: Option<String>,
    /// User id forwarded in the `x-user-id` header.
    pub user_id: Option<String>,
    /// Per-request timeout in seconds (default: 10).
    pub timeout_secs: Option<u64>,
    /// Retry attempts for read requests (default: 3).
    pub retry: Option<u32>,
    /// Delay between retries in milliseconds (default: 1000).
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncSection {
    /// Refresh interval in seconds for the sync loop (default: 30).
    pub refresh_interval_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    /// Returns the predictions base URL, or `None` if unset or empty.
    pub fn predictions_base_url(&self) -> Option<&str> {
        match self.api.predictions_base_url.as_deref() {
            Some("") | None => None,
            Some(url) => Some(url),
        }
    }

    /// Returns the refresh interval as Duration (default: 30 seconds).
    pub fn refresh_interval(&self) -> Duration {
        let secs = self
            .sync
            .as_ref()
            .and_then(|s| s.refresh_interval_secs)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// Returns the per-request timeout (default: 10 seconds).
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.api
                .timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Returns the retry attempt count for read requests (default: 3).
    pub fn retry_count(&self) -> u32 {
        self.api.retry.unwrap_or(DEFAULT_RETRY_COUNT)
    }

    /// Returns the delay between retries (default: 1000 ms).
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.api.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }
}
