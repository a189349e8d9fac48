//! Mock driver implementation for testing.
//!
//! Provides a `MockDriver` that simulates port discovery and transport
//! opening without requiring actual hardware. Supports scripted discovery
//! results, per-port failure injection, and open-call counting.

use super::{DriverError, PortDriver, PortKind, Transport, TransportHandle};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Inner state of the mock driver, protected by a mutex for interior
/// mutability.
#[derive(Debug, Default)]
struct MockDriverState {
    /// Ports reported by `discover`, in order.
    ports: Vec<(String, PortKind)>,
    /// Ports whose device file is considered absent.
    missing: HashSet<String>,
    /// Ports whose `open` calls fail.
    failing: HashSet<String>,
    /// Count of `open` calls per port name.
    open_calls: HashMap<String, usize>,
}

/// Mock port driver for testing.
///
/// This implementation allows you to:
/// - Script the discovery result (and change it between refreshes)
/// - Inject open failures for specific ports
/// - Mark devices as absent to exercise the vanished-port path
/// - Count how often each port was actually opened
///
/// # Example
/// ```
/// use serial_registry::driver::{MockDriver, PortDriver, PortKind};
///
/// let driver = MockDriver::with_ports(&["COM1", "COM2"]);
/// let discovered = driver.discover();
/// assert_eq!(discovered.len(), 2);
/// assert_eq!(discovered[0].0, "COM1");
///
/// let transport = driver.open("COM1", PortKind::Serial).unwrap();
/// assert_eq!(transport.lock().name(), "COM1");
/// assert_eq!(driver.open_calls("COM1"), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockDriverState>>,
}

impl MockDriver {
    /// Create a mock driver that discovers no ports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock driver discovering the given serial ports, in order.
    pub fn with_ports(names: &[&str]) -> Self {
        let driver = Self::new();
        driver.set_ports(names);
        driver
    }

    /// Replace the scripted discovery result.
    pub fn set_ports(&self, names: &[&str]) {
        let mut state = self.state.lock();
        state.ports = names
            .iter()
            .map(|n| (n.to_string(), PortKind::Serial))
            .collect();
    }

    /// Make subsequent `open` calls for `name` fail.
    pub fn fail_open(&self, name: &str) {
        self.state.lock().failing.insert(name.to_string());
    }

    /// Make `device_exists(name)` report false.
    pub fn mark_missing(&self, name: &str) {
        self.state.lock().missing.insert(name.to_string());
    }

    /// Number of times `open` was called for `name`.
    pub fn open_calls(&self, name: &str) -> usize {
        self.state.lock().open_calls.get(name).copied().unwrap_or(0)
    }
}

impl PortDriver for MockDriver {
    fn discover(&self) -> Vec<(String, PortKind)> {
        self.state.lock().ports.clone()
    }

    fn open(&self, name: &str, _kind: PortKind) -> Result<TransportHandle, DriverError> {
        let mut state = self.state.lock();
        *state.open_calls.entry(name.to_string()).or_insert(0) += 1;

        if state.failing.contains(name) {
            return Err(DriverError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "injected open failure",
            )));
        }
        if state.missing.contains(name) {
            return Err(DriverError::NotFound(name.to_string()));
        }
        Ok(Arc::new(Mutex::new(MockTransport::new(name))))
    }

    fn device_exists(&self, name: &str) -> bool {
        !self.state.lock().missing.contains(name)
    }
}

/// In-memory transport handed out by `MockDriver`.
///
/// Reads pop from a queue that tests can preload; writes are logged for
/// later inspection.
#[derive(Debug, Default)]
pub struct MockTransport {
    name: String,
    read_queue: VecDeque<u8>,
    write_log: Vec<Vec<u8>>,
}

impl MockTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.read_queue.extend(data);
    }

    /// Copy of all data written to the transport.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.write_log.clone()
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, DriverError> {
        self.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError> {
        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match self.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }
        if bytes_read == 0 {
            return Err(DriverError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "no data available",
            )));
        }
        Ok(bytes_read)
    }
}
