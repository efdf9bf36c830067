//! Configuration for a [`MultiScopeArchitecture`](crate::MultiScopeArchitecture).
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```toml
//! event_channel_capacity = 256
//!
//! [fan_out]
//! max_attempts = 3
//! initial_backoff_ms = 100
//! max_backoff_ms = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors while loading configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level architecture configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitectureConfig {
    /// Capacity of the [`ScopeEvent`](crate::ScopeEvent) broadcast channel.
    /// Slow subscribers lag once this many events are buffered.
    pub event_channel_capacity: usize,

    /// Retry policy used by [`RetryingFanOut`](crate::RetryingFanOut)
    pub fan_out: FanOutConfig,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 256,
            fan_out: FanOutConfig::default(),
        }
    }
}

impl ArchitectureConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the runtime cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_channel_capacity must be at least 1".to_string(),
            ));
        }
        self.fan_out.validate()
    }
}

/// Per-peer delivery retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanOutConfig {
    /// Total send attempts per peer, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay
    pub max_backoff_ms: u64,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
        }
    }
}

impl FanOutConfig {
    /// Delay after the given number of failed attempts (1-based).
    ///
    /// Doubles from `initial_backoff_ms` and saturates at `max_backoff_ms`.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(32);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "fan_out.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "fan_out.initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}
