//! Driver abstraction layer for port discovery and transport opening.
//!
//! The registry never touches hardware directly: everything below the
//! identity/ownership layer goes through a `PortDriver` collaborator. A
//! production driver backed by the `serialport` crate lives in
//! [`serial::SystemDriver`]; a scriptable [`mock::MockDriver`] supports
//! testing without hardware.

pub mod mock;
pub mod serial;

pub use mock::{MockDriver, MockTransport};
pub use serial::{SerialTransport, SystemDriver};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The kind of communication port an identifier refers to.
///
/// Only serial ports exist today; the enum is non-exhaustive so future kinds
/// (parallel, RS-485, raw) can be added without breaking callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PortKind {
    Serial,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
        }
    }
}

/// Errors reported by a `PortDriver`.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The named device does not exist on the system.
    #[error("device not found: {0}")]
    NotFound(String),

    /// An I/O error occurred while opening or using a transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error occurred.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Shared handle to an open transport.
///
/// Handles are compared by pointer identity (`Arc::ptr_eq`) when mapping an
/// open transport back to its registry entry.
pub type TransportHandle = Arc<Mutex<dyn Transport>>;

/// The live, driver-provided handle used for byte I/O once a port is
/// acquired.
///
/// The registry only cares about identity and lifetime; the byte-level
/// semantics (framing, line parameters) are the driver's business.
pub trait Transport: Send + fmt::Debug {
    /// The name of the port this transport was opened on.
    fn name(&self) -> &str;

    /// Write bytes to the port, returning the number actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, DriverError>;

    /// Read bytes from the port into `buffer`, returning the number read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError>;
}

/// Contract for the native driver collaborator.
///
/// Implementations enumerate physical ports and open transports on them.
/// `discover` and `open` are assumed blocking but bounded; the registry
/// calls `open` inside the identifier's critical section so two threads can
/// never race to open the same port.
pub trait PortDriver: Send + Sync + fmt::Debug {
    /// Enumerate the ports currently visible to the driver, in a stable
    /// order.
    fn discover(&self) -> Vec<(String, PortKind)>;

    /// Open a transport on the named port.
    fn open(&self, name: &str, kind: PortKind) -> Result<TransportHandle, DriverError>;

    /// Whether the underlying device file still exists.
    ///
    /// Used to tell "gone permanently" (`PortVanished`) from a transient
    /// open failure (`PortUnavailable`).
    fn device_exists(&self, name: &str) -> bool;
}
