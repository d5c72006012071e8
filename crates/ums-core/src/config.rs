//! Configuration for the coordination layer.
//!
//! Parsed from the `key=value` file at `.ums/config`, merged over defaults.
//! The hook installer bakes the timeout and fail policy into the generated
//! scripts, so a config change takes effect on the next `install_all`.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid config line: {0}")]
    InvalidLine(String),
    #[error("invalid boolean value for {key}: {value}")]
    InvalidBool { key: String, value: String },
    #[error("invalid integer value for {key}: {value}")]
    InvalidInt { key: String, value: String },
}

/// Coordination settings shared by the watchers and the hook installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinationConfig {
    /// Watcher poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// How long a blocking hook waits for its result before giving up.
    pub hook_timeout_secs: u32,
    /// Blocking-hook policy when no result arrives. Fail-closed by default:
    /// a missing UMS process blocks the commit.
    pub fail_open: bool,
    /// File extension of model resources in the working tree.
    pub model_extension: String,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            hook_timeout_secs: 5,
            fail_open: false,
            model_extension: "model".to_string(),
        }
    }
}

impl CoordinationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Load config from a file, merging with defaults. A missing file yields
    /// the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if path.exists() {
            config.load_file(path)?;
        }
        Ok(config)
    }

    /// Load and merge values from a config file.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.parse_content(&content)
    }

    fn parse_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine(line.to_string()));
            };
            let key = key.trim();
            let value = Self::unquote(value.trim());
            self.apply_value(key, &value)?;
        }
        Ok(())
    }

    fn unquote(value: &str) -> String {
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            return value[1..value.len() - 1].to_string();
        }
        value.to_string()
    }

    fn apply_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "poll_interval_ms" => {
                self.poll_interval_ms = value.parse().map_err(|_| ConfigError::InvalidInt {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            }
            "hook_timeout_secs" => {
                self.hook_timeout_secs = value.parse().map_err(|_| ConfigError::InvalidInt {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            }
            "fail_open" => self.fail_open = Self::parse_bool(key, value)?,
            "model_extension" => self.model_extension = value.to_string(),
            _ => {
                eprintln!("Warning: unknown config key: {key}");
            }
        }
        Ok(())
    }

    fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "on" => Ok(true),
            "false" | "0" | "no" | "n" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }
}
