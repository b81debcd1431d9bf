//! Application settings.
//!
//! Settings are read from a TOML file:
//!
//! ```toml
//! rules_path = "/home/me/.config/foldersort/rules.json"
//! log_dir = "/home/me/.config/foldersort/logs"
//! log_level = "info"
//! persist_history = true
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(#[from] toml::de::Error),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for the command-line tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rules file. Defaults to `~/.config/foldersort/rules.json`.
    pub rules_path: Option<PathBuf>,
    /// Directory for daily log files. Defaults to `~/.config/foldersort/logs`.
    pub log_dir: Option<PathBuf>,
    /// Default log filter, overridden by `RUST_LOG`.
    pub log_level: String,
    /// Whether organize runs leave an undo journal in the organized directory.
    pub persist_history: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            log_dir: None,
            log_level: "info".to_string(),
            persist_history: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.foldersortrc.toml` in the current directory
    /// 3. Look for `~/.config/foldersort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any file found is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".foldersortrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(dir) = app_dir() {
            let home_config = dir.join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The rules file to use, falling back to the per-user default.
    pub fn rules_path(&self) -> PathBuf {
        self.rules_path
            .clone()
            .unwrap_or_else(|| app_dir_or_local().join("rules.json"))
    }

    /// The log directory to use, falling back to the per-user default.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| app_dir_or_local().join("logs"))
    }
}

/// `~/.config/foldersort`, if `HOME` is set.
fn app_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("foldersort")
    })
}

fn app_dir_or_local() -> PathBuf {
    app_dir().unwrap_or_else(|| PathBuf::from(".foldersort"))
}
