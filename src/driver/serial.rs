//! Production driver backed by the `serialport` crate.
//!
//! Wraps `serialport`'s enumeration and open calls behind the `PortDriver`
//! trait so the registry can be exercised against real hardware or a mock
//! interchangeably.

use super::{DriverError, PortDriver, PortKind, Transport, TransportHandle};
use crate::config::SerialConfig;
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// System serial driver.
///
/// Opens ports with a fixed baud rate and timeout; per-port line-parameter
/// negotiation is out of scope for the registry and can be layered on top
/// of the returned transport.
#[derive(Debug, Clone)]
pub struct SystemDriver {
    baud_rate: u32,
    open_timeout: Duration,
}

impl SystemDriver {
    /// Create a driver opening ports at `baud_rate` with the given
    /// read/write timeout.
    pub fn new(baud_rate: u32, open_timeout: Duration) -> Self {
        Self {
            baud_rate,
            open_timeout,
        }
    }

    /// Create a driver from the serial section of the configuration.
    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(config.default_baud, config.open_timeout())
    }
}

impl Default for SystemDriver {
    fn default() -> Self {
        Self::new(115_200, Duration::from_secs(1))
    }
}

impl PortDriver for SystemDriver {
    fn discover(&self) -> Vec<(String, PortKind)> {
        match serialport::available_ports() {
            Ok(ports) => {
                debug!(count = ports.len(), "discovered serial ports");
                ports
                    .into_iter()
                    .map(|p| (p.port_name, PortKind::Serial))
                    .collect()
            }
            Err(err) => {
                warn!(%err, "serial port discovery failed");
                Vec::new()
            }
        }
    }

    fn open(&self, name: &str, kind: PortKind) -> Result<TransportHandle, DriverError> {
        match kind {
            PortKind::Serial => {}
        }
        let port = serialport::new(name, self.baud_rate)
            .timeout(self.open_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => DriverError::NotFound(name.to_string()),
                _ => DriverError::Serial(e),
            })?;
        debug!(port = name, baud = self.baud_rate, "opened serial transport");
        let transport: TransportHandle = Arc::new(Mutex::new(SerialTransport {
            port,
            name: name.to_string(),
        }));
        Ok(transport)
    }

    fn device_exists(&self, name: &str) -> bool {
        // On unix, port names are device-node paths that can be checked
        // directly; a stat is much cheaper than a full enumeration.
        #[cfg(unix)]
        if name.starts_with('/') {
            return std::path::Path::new(name).exists();
        }

        serialport::available_ports()
            .map(|ports| ports.iter().any(|p| p.port_name == name))
            .unwrap_or(false)
    }
}

/// Transport over a live `serialport::SerialPort`.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, DriverError> {
        self.port.write(data).map_err(DriverError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError> {
        self.port.read(buffer).map_err(DriverError::Io)
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}
