//! Configuration management for stashcode
//!
//! Handles loading and saving configuration from ~/.config/stashcode/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::registry::ShareDuration;
use crate::storage::default_db_path;

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Application name for config directory
const APP_NAME: &str = "stashcode";

/// Share service used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:6332";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Unknown config key: {0} (expected api_base_url, default_expiration, db_path or log_file)")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Base URL of the share service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Lifetime used when `create` is not given one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expiration: Option<ShareDuration>,

    /// Location of the local state database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// Write debug logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the config file path
    ///
    /// Returns ~/.config/stashcode/config.toml on Linux
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Get the config directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_NAME))
    }

    /// Load configuration from the default file
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default file
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file, creating its directory
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check if any configuration is set
    pub fn is_empty(&self) -> bool {
        self.api_base_url.is_none()
            && self.default_expiration.is_none()
            && self.db_path.is_none()
            && self.log_file.is_none()
    }

    /// Set a key from its string form; `None` unsets it
    pub fn set(&mut self, key: &str, value: Option<&str>) -> ConfigResult<()> {
        match key {
            "api_base_url" => {
                if let Some(url) = value {
                    if !(url.starts_with("http://") || url.starts_with("https://")) {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: "must start with http:// or https://".to_string(),
                        });
                    }
                }
                self.api_base_url = value.map(|v| v.trim_end_matches('/').to_string());
            }
            "default_expiration" => {
                self.default_expiration = value
                    .map(|v| v.parse::<ShareDuration>())
                    .transpose()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: e.to_string(),
                    })?;
            }
            "db_path" => self.db_path = value.map(PathBuf::from),
            "log_file" => self.log_file = value.map(str::to_string),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Effective service URL: CLI flag, then config, then default
    pub fn effective_api_url(&self, cli: Option<&str>) -> String {
        cli.or(self.api_base_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Effective share lifetime: CLI flag, then config, then 24h
    pub fn effective_duration(&self, cli: Option<ShareDuration>) -> ShareDuration {
        cli.or(self.default_expiration).unwrap_or_default()
    }

    /// Effective state database: CLI flag, then config, then default
    pub fn effective_db_path(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.db_path.clone())
            .unwrap_or_else(default_db_path)
    }
}

/// Format the configuration for display
pub fn format_config(config: &Config) -> String {
    let mut lines = Vec::new();

    lines.push("Current configuration:".to_string());
    lines.push(String::new());

    match config.api_base_url {
        Some(ref url) => lines.push(format!("  api_base_url = \"{}\"", url)),
        None => lines.push(format!(
            "  api_base_url = (not set, using {})",
            DEFAULT_API_URL
        )),
    }

    match config.default_expiration {
        Some(d) => lines.push(format!("  default_expiration = \"{}\"", d)),
        None => lines.push("  default_expiration = (not set, using 24h)".to_string()),
    }

    match config.db_path {
        Some(ref path) => lines.push(format!("  db_path = \"{}\"", path.display())),
        None => lines.push(format!(
            "  db_path = (not set, using {})",
            default_db_path().display()
        )),
    }

    match config.log_file {
        Some(ref file) => lines.push(format!("  log_file = \"{}\"", file)),
        None => lines.push("  log_file = (not set)".to_string()),
    }

    lines.join("\n")
}
