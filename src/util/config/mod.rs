//! Runtime configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Environment variables (PROMISSORY_THREADS, PROMISSORY_LOG)
//! 3. Configuration file (promissory.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use promissory::util::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_toml_str("[pool]\nnum_threads = 2\n").unwrap();
//! assert_eq!(config.pool.resolved_threads(), 2);
//! ```

use std::fs;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::logger::LogLevel;

/// Environment variable overriding the worker count.
pub const ENV_THREADS: &str = "PROMISSORY_THREADS";

/// Environment variable overriding the log level.
pub const ENV_LOG: &str = "PROMISSORY_LOG";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeConfig {
    /// Thread pool settings
    #[serde(default)]
    pub pool: PoolConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Thread pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    /// Worker count; hardware concurrency when unset
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Worker thread name prefix
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// Worker stack size in bytes
    #[serde(default)]
    pub stack_size: Option<usize>,
    /// Priority of jobs submitted through the pool executor
    #[serde(default = "default_priority")]
    pub default_priority: i32,
}

fn default_thread_name() -> String {
    "promissory-worker".to_string()
}

fn default_priority() -> i32 {
    1
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: default_thread_name(),
            stack_size: None,
            default_priority: default_priority(),
        }
    }
}

impl PoolConfig {
    /// Configured worker count, or hardware concurrency; never zero.
    pub fn resolved_threads(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Level name: debug, info, warn or error
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LogConfig {
    /// Parsed log level.
    pub fn level(&self) -> Result<LogLevel, ConfigError> {
        self.level.parse()
    }
}

impl RuntimeConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides<F>(
        &mut self,
        lookup: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(threads) = lookup(ENV_THREADS) {
            let threads = threads
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_THREADS.to_string(),
                    value: threads.clone(),
                })?;
            self.pool.num_threads = Some(threads);
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log.level = level;
        }
        self.validate()
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.num_threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "pool.num_threads".to_string(),
                value: "0".to_string(),
            });
        }
        self.log.level()?;
        Ok(())
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    RuntimeConfig::from_toml_str(&content)
}

/// Load configuration from `path` if it exists, defaults otherwise, then apply the environment.
pub fn load_config_or_default(path: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
    let mut config = match path {
        Some(path) if path.exists() => load_config(path)?,
        _ => RuntimeConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests;
