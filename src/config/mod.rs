//! Configuration module for scope-rs
//!
//! This module handles the scope configuration file:
//! - Polling cadence for value and topology snapshots
//! - Autocomplete display limits
//! - Initial mask settings (hidden processes, pending display)
//! - Data source selection
//! - Logging overrides
//!
//! # Config Location
//!
//! When no path is given the configuration is read from the platform config
//! directory under `dev.scope-rs`:
//! - **Linux**: `~/.config/dev.scope-rs/scope.toml`
//! - **macOS**: `~/Library/Application Support/dev.scope-rs/scope.toml`
//! - **Windows**: `%APPDATA%\dev.scope-rs\scope.toml`
//!
//! # Example
//!
//! ```toml
//! [polling]
//! interval_ms = 250
//! topology_every = 5
//!
//! [filter]
//! hidden_processes = ["PLOGGER"]
//!
//! [source]
//! kind = "json_file"
//! path = "/tmp/community.json"
//! ```

use crate::error::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "dev.scope-rs";

/// Config filename
pub const CONFIG_FILE: &str = "scope.toml";

/// Default value poll interval (4 polls per second)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Default number of value polls per topology poll
pub const DEFAULT_TOPOLOGY_EVERY: u32 = 5;

/// Default cap on the suggestion list
pub const DEFAULT_MAX_SUGGESTIONS: usize = 30;

/// Appended to a capped suggestion list
pub const DEFAULT_TRUNCATION_MARKER: &str = "...";

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Scope Config ====================

/// Complete scope configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub autocomplete: AutocompleteConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScopeConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScopeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            ScopeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ScopeError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ScopeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ScopeError::Config(format!("Failed to write config: {}", e)))
    }

    /// Reject settings the polling agent and autocomplete cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_ms == 0 {
            return Err(ScopeError::Config(
                "polling.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.polling.topology_every == 0 {
            return Err(ScopeError::Config(
                "polling.topology_every must be greater than zero".to_string(),
            ));
        }
        if self.autocomplete.max_suggestions == 0 {
            return Err(ScopeError::Config(
                "autocomplete.max_suggestions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Polling Config ====================

/// Polling cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval between value snapshot requests in milliseconds
    pub interval_ms: u64,

    /// A topology request is issued on every Nth tick
    pub topology_every: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            topology_every: DEFAULT_TOPOLOGY_EVERY,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ==================== Autocomplete Config ====================

/// Suggestion list limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteConfig {
    /// Maximum number of suggestions shown
    pub max_suggestions: usize,

    /// Entry appended when the suggestion list was capped
    pub truncation_marker: String,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            truncation_marker: DEFAULT_TRUNCATION_MARKER.to_string(),
        }
    }
}

// ==================== Filter Config ====================

/// Initial mask settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Show variables that have not received a value yet
    #[serde(default)]
    pub show_pending: bool,

    /// Processes hidden at startup
    #[serde(default)]
    pub hidden_processes: Vec<String>,
}

// ==================== Source Config ====================

/// Which data source the polling agent talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic vehicle community
    Simulated {
        /// Name reported as the community of generated variables
        #[serde(default = "default_community")]
        community: String,
    },
    /// JSON dump of values and topology, re-read on every request
    JsonFile { path: PathBuf },
}

fn default_community() -> String {
    "alpha".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Simulated {
            community: default_community(),
        }
    }
}

impl std::fmt::Display for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceConfig::Simulated { community } => write!(f, "simulated ({})", community),
            SourceConfig::JsonFile { path } => write!(f, "JSON file {}", path.display()),
        }
    }
}

// ==================== Logging Config ====================

/// Logging overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default)]
    pub level: Option<String>,

    /// Directory for daily-rolled log files
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

// ==================== Tests ====================
