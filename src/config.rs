//! lspsync configuration.
//!
//! Loaded from `lspsync.toml` at the workspace root:
//!
//! ```toml
//! [watch]
//! debounce_ms = 300
//! skip_hidden = true
//! skip_dirs = ["node_modules", ".git", "target"]
//! debug_registrations = false
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Name of the per-workspace configuration file.
pub const CONFIG_FILE: &str = "lspsync.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// Watch run settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the watch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiescence window for coalescing writes, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Skip directories whose name starts with a dot
    #[serde(default = "default_true")]
    pub skip_hidden: bool,

    /// Directory names that are never watched
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,

    /// Log each advertised watch pattern individually
    #[serde(default)]
    pub debug_registrations: bool,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_skip_dirs() -> Vec<String> {
    ["node_modules", ".git", ".idea", ".vscode", "dist", "build", "target"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            skip_hidden: true,
            skip_dirs: default_skip_dirs(),
            debug_registrations: false,
        }
    }
}

impl WatchConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SyncConfig {
    /// Load `lspsync.toml` from the workspace root.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// read or parsed is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| SyncError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;

        Self::parse(&content).map_err(|e| SyncError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
