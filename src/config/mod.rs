//! Configuration module for serial-registry.
//!
//! This module provides TOML-based configuration with environment variable
//! overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of
//! priority):
//!
//! 1. `SERIAL_REGISTRY_CONFIG` environment variable (explicit path)
//! 2. `./serial-registry.toml` (current directory)
//! 3. `~/.config/serial-registry/serial-registry.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\serial-registry\serial-registry.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Scalar values can be overridden via environment variables following the
//! pattern `SERIAL_REGISTRY_<SECTION>_<KEY>`:
//! - `SERIAL_REGISTRY_REGISTRY_ACQUIRE_TIMEOUT_MS=500`
//! - `SERIAL_REGISTRY_SERIAL_DEFAULT_BAUD=9600`
//! - `SERIAL_REGISTRY_LOG_LEVEL=debug`

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, RegistryConfig, SerialConfig};
