//! Configuration loading for the files reader.
//!
//! Configuration is loaded from a TOML file or built in code.

use serde::Deserialize;
use session_sync_core::RunLimits;
use session_sync_types::{ReadOptions, TimeRange};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for an [`AllFilesReader`](crate::AllFilesReader).
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    /// Contract the reader syncs for.
    pub contract: ContractConfig,
    /// Polling cadence and termination ceilings.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Contract configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Application identifier used when minting tokens.
    pub app_id: String,
    /// Contract identifier; scopes the session and the time-range cache.
    pub contract_id: String,
    /// Whether the contract sources device-local data (default: false).
    #[serde(default)]
    pub device_data: bool,
    /// Optional narrowing of the contract's time range for device data.
    #[serde(default)]
    pub scope: Option<TimeRange>,
}

/// Polling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollingConfig {
    /// Seconds between poll timer fires (default: 3).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Consecutive unchanged listings before giving up (default: 100).
    #[serde(default = "default_max_stale_polls")]
    pub max_stale_polls: u32,
    /// Consecutive pending evaluations before giving up (default: 20).
    #[serde(default = "default_max_pending_evaluations")]
    pub max_pending_evaluations: u32,
    /// Maximum run duration in seconds (default: 300).
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
}

// Default value functions
fn default_interval_secs() -> u64 {
    3
}

fn default_max_stale_polls() -> u32 {
    100
}

fn default_max_pending_evaluations() -> u32 {
    20
}

fn default_max_duration_secs() -> u64 {
    5 * 60 // 5 minutes
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_stale_polls: default_max_stale_polls(),
            max_pending_evaluations: default_max_pending_evaluations(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

impl PollingConfig {
    /// Run limits derived from this configuration.
    pub fn limits(&self) -> RunLimits {
        RunLimits {
            poll_interval: Duration::from_secs(self.interval_secs),
            max_stale_polls: self.max_stale_polls,
            max_pending_evaluations: self.max_pending_evaluations,
            max_sync_duration: Duration::from_secs(self.max_duration_secs),
        }
    }
}

impl ReaderConfig {
    /// Create a configuration for a contract with default polling.
    pub fn new(app_id: &str, contract_id: &str) -> Self {
        Self {
            contract: ContractConfig {
                app_id: app_id.to_string(),
                contract_id: contract_id.to_string(),
                device_data: false,
                scope: None,
            },
            polling: PollingConfig::default(),
        }
    }

    /// Set whether the contract sources device-local data.
    pub fn with_device_data(mut self, enabled: bool) -> Self {
        self.contract.device_data = enabled;
        self
    }

    /// Restrict device-local collection to a window.
    pub fn with_scope(mut self, scope: TimeRange) -> Self {
        self.contract.scope = Some(scope);
        self
    }

    /// Replace the polling configuration.
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Read options passed to time-range resolution.
    pub fn read_options(&self) -> Option<ReadOptions> {
        self.contract.scope.map(ReadOptions::scoped)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
