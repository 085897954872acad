//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/draftwell/config.toml)
//! 3. Environment variables (DRAFTWELL_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::outline::OutlineOptions;
use crate::session::SessionOptions;

/// Environment variable prefix
const ENV_PREFIX: &str = "DRAFTWELL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory for data storage (SQLite db)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Save automatically after a quiet period
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,

    /// Quiet period before an automatic save, in milliseconds
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Shallowest heading level shown in the outline
    #[serde(default = "default_outline_min_level")]
    pub outline_min_level: u8,

    /// Title given to new documents
    #[serde(default = "default_new_document_title")]
    pub new_document_title: String,

    /// Initial content of new documents
    #[serde(default = "default_new_document_template")]
    pub new_document_template: String,

    /// Log level filter (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            auto_save: default_auto_save(),
            autosave_delay_ms: default_autosave_delay_ms(),
            outline_min_level: default_outline_min_level(),
            new_document_title: default_new_document_title(),
            new_document_template: default_new_document_template(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DRAFTWELL_DATA_DIR, DRAFTWELL_AUTO_SAVE, ...)
    /// 2. Config file (~/.config/draftwell/config.toml or DRAFTWELL_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit `--config` path
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Some(val) = env_var("AUTO_SAVE") {
            self.auto_save = val.eq_ignore_ascii_case("true") || val == "1";
        }

        if let Some(val) = env_var("AUTOSAVE_DELAY_MS") {
            self.autosave_delay_ms = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_AUTOSAVE_DELAY_MS: {:?}", ENV_PREFIX, val))?;
        }

        if let Some(val) = env_var("OUTLINE_MIN_LEVEL") {
            self.outline_min_level = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_OUTLINE_MIN_LEVEL: {:?}", ENV_PREFIX, val))?;
        }

        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DRAFTWELL_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("draftwell")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("draftwell.db")
    }

    /// Quiet window for automatic saves
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Options for the editing session controller
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            autosave_delay: self.autosave_delay(),
            auto_save: self.auto_save,
            outline: OutlineOptions::from_min_level(self.outline_min_level),
            new_document_title: self.new_document_title.clone(),
            new_document_template: self.new_document_template.clone(),
        }
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("draftwell")
}

fn default_auto_save() -> bool {
    true
}

fn default_autosave_delay_ms() -> u64 {
    500
}

fn default_outline_min_level() -> u8 {
    2
}

fn default_new_document_title() -> String {
    "Untitled".to_string()
}

fn default_new_document_template() -> String {
    "# Untitled\n\nStart writing...".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}
