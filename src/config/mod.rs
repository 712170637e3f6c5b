//! Configuration module for ns-formatters
//!
//! This module handles the tool configuration:
//! - Decoder safety ceilings ([`FormatterSettings`])
//! - Logging filter and display depth for the command-line front end
//!
//! # Config Location
//!
//! The config file is read from the platform-appropriate location unless a path
//! is given explicitly:
//! - **Linux**: `~/.config/dev.hxyulin.ns-formatters/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.ns-formatters/config.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.ns-formatters\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use ns_formatters::config::AppConfig;
//!
//! let config = AppConfig::load_or_default();
//! assert_eq!(config.formatters.max_children, 256);
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{FormatterError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.ns-formatters";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "warn,ns_formatters=info";

/// Default depth of the printed child tree
pub const DEFAULT_MAX_DEPTH: usize = 3;

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tracing filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// How many levels of children the CLI prints
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Decoder limits
    #[serde(default)]
    pub formatters: FormatterSettings,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            max_depth: DEFAULT_MAX_DEPTH,
            formatters: FormatterSettings::default(),
        }
    }
}

impl AppConfig {
    /// Parse a config from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)
            .map_err(|e| FormatterError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config.sanitized())
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| FormatterError::Config(format!("Failed to read config: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Load the config from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FormatterError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path.as_ref(), content)
            .map_err(|e| FormatterError::Config(format!("Failed to write config: {}", e)))
    }

    fn sanitized(mut self) -> Self {
        self.formatters = self.formatters.sanitized();
        self
    }
}
