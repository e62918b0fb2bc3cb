//! Configuration management for watchbatch
//!
//! The configuration document names the watch root and the files inside it
//! to monitor. JSON and TOML documents are both accepted.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::DiffAlgorithmType;

pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Json(#[from] serde_json::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Monitoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Directory containing the watched files
    #[serde(alias = "Path")]
    pub path: PathBuf,
    /// File names relative to `path`
    #[serde(alias = "Files")]
    pub files: Vec<String>,
    /// Time between flushes in milliseconds
    #[serde(default = "default_flush_interval_ms", alias = "FlushIntervalMs")]
    pub flush_interval_ms: u64,
    #[serde(default)]
    pub algorithm: DiffAlgorithmType,
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

impl MonitorConfig {
    pub fn new(path: impl Into<PathBuf>, files: Vec<String>) -> Self {
        Self {
            path: path.into(),
            files,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            algorithm: DiffAlgorithmType::default(),
        }
    }

    /// Load a configuration document, TOML for `.toml` files and JSON otherwise
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override with environment variables if present
    pub fn apply_env(mut self) -> Self {
        if let Ok(val) = std::env::var("WATCHBATCH_PATH") {
            if !val.is_empty() {
                self.path = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("WATCHBATCH_FLUSH_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.flush_interval_ms = ms;
            }
        }

        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.files.is_empty() {
            return Err(ConfigError::Validation("files must not be empty".to_string()));
        }

        if self.flush_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "flush_interval_ms must be greater than 0".to_string(),
            ));
        }

        for file in &self.files {
            if file.is_empty() || file == "." || file == ".." || file.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "`{}` must be a plain file name inside the watch path",
                    file
                )));
            }
        }

        Ok(())
    }
}
