//! Engine configuration model.
//!
//! Loaded from `config.toml` by the infrastructure `ConfigService`. Every field
//! has a serde default so partial files are valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub auto_save: AutoSaveConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of entries kept (values below 1 behave as 1)
    #[serde(default = "default_max_history")]
    pub max_size: usize,
    /// Collapse consecutive `move_node` entries for the same node that land
    /// within this many milliseconds. `None` keeps one entry per edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coalesce_window_ms: Option<u64>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_history(),
            coalesce_window_ms: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period after the last edit before a debounced save fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Upper bound for each remote store call
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
    /// Fetch the remote record before overwriting it and stop on divergence
    #[serde(default = "default_true")]
    pub detect_conflicts_on_save: bool,
}

impl AutoSaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            remote_timeout_ms: default_remote_timeout_ms(),
            detect_conflicts_on_save: true,
        }
    }
}

/// Hosted backend settings. Remote persistence is disabled without a `base_url`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

fn default_max_history() -> usize {
    50
}

fn default_debounce_ms() -> u64 {
    1_500
}

fn default_remote_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}
