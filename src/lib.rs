//! Serial Registry Library
//!
//! This library provides a thread-safe catalog of discoverable communication
//! ports, each guarded by a single-owner lock with blocking/timeout
//! acquisition, owner-change notification, and release-on-close semantics.
//! The native transport work (enumeration, byte I/O) is delegated to a
//! pluggable driver collaborator.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `driver`: Driver abstraction (`PortDriver`), system and mock drivers
//! - `error`: Registry error taxonomy
//! - `identifier`: Port identity and the per-port ownership arbiter
//! - `listener`: Ownership-change events and subscriber plumbing
//! - `registry`: The port collection itself
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serial_registry::{AcquireTimeout, PortRegistry};
//! use serial_registry::driver::MockDriver;
//!
//! let driver = Arc::new(MockDriver::with_ports(&["COM1"]));
//! let registry = PortRegistry::new(driver);
//!
//! let port = registry.lookup_by_name("COM1")?;
//! let transport = port.acquire("example", AcquireTimeout::NoWait)?;
//! assert_eq!(transport.lock().name(), "COM1");
//! port.release();
//! # Ok::<(), serial_registry::RegistryError>(())
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod identifier;
pub mod listener;
pub mod registry;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use driver::{DriverError, PortDriver, PortKind, Transport, TransportHandle};
pub use error::RegistryError;
pub use identifier::{AcquireTimeout, PortIdentifier};
pub use listener::{ListenerSet, OwnershipEvent, OwnershipListener};
pub use registry::PortRegistry;
