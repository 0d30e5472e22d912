//! Configuration types for the awaker client core

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Location of the Lead Awaker REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ApiConfig {
    /// Join an absolute API path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Health polling timings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Delay before the first probe after start
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Upper bound on a single health probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    /// Poll interval while the backend is reachable
    #[serde(default = "default_connected_interval")]
    pub connected_interval_seconds: u64,
    /// Poll interval while the backend is unreachable
    #[serde(default = "default_disconnected_interval")]
    pub disconnected_interval_seconds: u64,
    /// How long `recovered` is shown before reverting to `connected`
    #[serde(default = "default_recovered_display")]
    pub recovered_display_seconds: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            probe_timeout_seconds: default_probe_timeout(),
            connected_interval_seconds: default_connected_interval(),
            disconnected_interval_seconds: default_disconnected_interval(),
            recovered_display_seconds: default_recovered_display(),
        }
    }
}

impl ConnectivityConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn connected_interval(&self) -> Duration {
        Duration::from_secs(self.connected_interval_seconds)
    }

    pub fn disconnected_interval(&self) -> Duration {
        Duration::from_secs(self.disconnected_interval_seconds)
    }

    pub fn recovered_display(&self) -> Duration {
        Duration::from_secs(self.recovered_display_seconds)
    }
}

/// Activity feed paging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub account_id: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            account_id: None,
        }
    }
}

/// Durable key/value storage location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file backing the store; `None` keeps everything in memory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_initial_delay() -> u64 {
    2000
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_connected_interval() -> u64 {
    60
}

fn default_disconnected_interval() -> u64 {
    10
}

fn default_recovered_display() -> u64 {
    3
}

fn default_page_size() -> u32 {
    50
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::AwakerError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
