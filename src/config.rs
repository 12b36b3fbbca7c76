//! Server configuration.

use std::path::Path;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::retry::RetryPolicy;
use crate::roster_file::CostNames;

/// Environment variable that overrides `database_path`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Configuration for the campaign server.
#[derive(Debug, Clone, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct CampaignConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    database_path: String,

    /// Address to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// How long a connection waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    busy_timeout_ms: u32,

    /// Attempts for operations that hit a concurrent update.
    #[serde(default = "default_retry_max_attempts")]
    retry_max_attempts: u32,

    /// Base delay between retries, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    retry_base_delay_ms: u64,

    /// Cost entry holding a roster's primary currency.
    #[serde(default = "default_primary_cost_name")]
    primary_cost_name: String,

    /// Cost entry holding a roster's glory points.
    #[serde(default = "default_glory_cost_name")]
    glory_cost_name: String,
}

fn default_database_path() -> String {
    "strictly_campaign.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_busy_timeout_ms() -> u32 {
    5_000
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    10
}

fn default_primary_cost_name() -> String {
    "ducats".to_string()
}

fn default_glory_cost_name() -> String {
    "glory points".to_string()
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            host: default_host(),
            port: default_port(),
            busy_timeout_ms: default_busy_timeout_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            primary_cost_name: default_primary_cost_name(),
            glory_cost_name: default_glory_cost_name(),
        }
    }
}

impl CampaignConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(database = %config.database_path, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise defaults, then applies the
    /// `DATABASE_URL` override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        Ok(match std::env::var(DATABASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                info!(database = %url, "Database path overridden from environment");
                config.with_database_path(url)
            }
            _ => config,
        })
    }

    /// Retry policy for concurrent-update conflicts.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, self.retry_base_delay_ms)
    }

    /// Cost names used when parsing roster uploads.
    pub fn cost_names(&self) -> CostNames {
        CostNames::new(self.primary_cost_name.clone(), self.glory_cost_name.clone())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
