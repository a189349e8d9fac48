//! Registry-level error types.
//!
//! Defines the error taxonomy surfaced by `PortRegistry` and the per-port
//! ownership arbiter, separate from driver-level errors to maintain clean
//! separation of concerns.

use crate::driver::DriverError;
use thiserror::Error;

/// Errors that can occur during registry lookups and ownership arbitration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No port with the given name is registered.
    #[error("port not found: {0}")]
    PortNotFound(String),

    /// The port is held by another owner and the contention window elapsed.
    #[error("port '{port}' is in use by '{owner}'")]
    PortInUse { port: String, owner: String },

    /// The port is unowned but the driver could not open a transport for it.
    #[error("port '{port}' could not be opened")]
    PortUnavailable {
        port: String,
        #[source]
        source: DriverError,
    },

    /// The underlying device is confirmed absent, or the identifier was
    /// dropped from the registry by a refresh.
    #[error("port '{port}' has vanished from the system")]
    PortVanished { port: String },
}

impl RegistryError {
    /// Create a `PortNotFound` error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::PortNotFound(port_name.into())
    }

    /// Create a `PortInUse` error from a port name and its current owner.
    pub fn in_use(port: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::PortInUse {
            port: port.into(),
            owner: owner.into(),
        }
    }

    /// Create a `PortVanished` error from a port name.
    pub fn vanished(port: impl Into<String>) -> Self {
        Self::PortVanished { port: port.into() }
    }
}
