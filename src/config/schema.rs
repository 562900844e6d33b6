//! Configuration schema

use crate::rules::FallbackOutput;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Placement for documents no rule matches
    #[serde(default)]
    pub unsorted: FallbackOutput,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding Rule and Variable resources (`~` and `$VAR` expanded)
    #[serde(default)]
    pub resources_dir: Option<PathBuf>,

    /// Seconds to wait before reacting to the same file again
    #[serde(default = "default_debounce")]
    pub debounce_seconds: u64,

    /// Polling interval in seconds for watching resource changes
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            resources_dir: None,
            debounce_seconds: default_debounce(),
            polling_interval_secs: default_polling_interval(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_debounce() -> u64 {
    2
}

fn default_polling_interval() -> u64 {
    5
}
