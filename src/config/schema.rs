//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All sections carry defaults so the crate works with no file at all.

use crate::identifier::AcquireTimeout;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry behavior
    pub registry: RegistryConfig,
    /// Serial driver parameters
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Registry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How long an acquire may contend before failing, in milliseconds.
    /// `0` means do not block.
    pub acquire_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 2000,
        }
    }
}

impl RegistryConfig {
    /// The configured contention window as an `AcquireTimeout`.
    pub fn acquire_timeout(&self) -> AcquireTimeout {
        AcquireTimeout::from_millis(self.acquire_timeout_ms)
    }
}

/// Serial driver configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate used when opening transports
    pub default_baud: u32,
    /// Read/write timeout applied to opened transports, in milliseconds
    pub open_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_baud: 115_200,
            open_timeout_ms: 1000,
        }
    }
}

impl SerialConfig {
    /// Get the open timeout as a Duration
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Standard multi-field output
    #[default]
    Full,
    /// Single-line compact output
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry.acquire_timeout_ms, 2000);
        assert_eq!(config.serial.default_baud, 115_200);
        assert_eq!(config.serial.open_timeout(), Duration::from_secs(1));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Full);
    }

    #[test]
    fn test_acquire_timeout_zero_means_nowait() {
        let section = RegistryConfig {
            acquire_timeout_ms: 0,
        };
        assert_eq!(section.acquire_timeout(), AcquireTimeout::NoWait);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
            [serial]
            default_baud = 9600

            [logging]
            format = "compact"
        "#;
        let config: Config = toml::from_str(toml).expect("valid TOML");
        assert_eq!(config.serial.default_baud, 9600);
        assert_eq!(config.serial.open_timeout_ms, 1000);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.registry.acquire_timeout_ms, 2000);
    }
}
