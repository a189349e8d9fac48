//! Process-wide catalog of discoverable communication ports.
//!
//! `PortRegistry` is an explicitly constructed, injectable instance (no
//! hidden global): the process's composition root builds one around a
//! `PortDriver` and passes it by reference to whoever needs lookups. The
//! registry lock protects the collection structure only; each entry carries
//! its own finer-grained ownership lock, and the registry lock is never
//! held across a blocking wait or a listener callback.

use crate::driver::{PortDriver, PortKind, TransportHandle};
use crate::error::RegistryError;
use crate::identifier::PortIdentifier;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Default)]
struct Entries {
    /// Insertion-ordered name -> identifier map. Order determines
    /// enumeration order.
    map: IndexMap<String, Arc<PortIdentifier>>,
    /// Whether driver discovery has run at least once.
    populated: bool,
}

/// Registry of port identifiers, keyed by name, insertion-ordered.
///
/// The collection is populated lazily on first lookup/enumeration and can be
/// rebuilt wholesale with [`refresh`](Self::refresh). Identifiers handed out
/// before a refresh stay alive but are revoked: further acquires on them
/// fail with `PortVanished`.
pub struct PortRegistry {
    driver: Arc<dyn PortDriver>,
    entries: Mutex<Entries>,
}

impl PortRegistry {
    /// Create an empty registry around the given driver collaborator.
    pub fn new(driver: Arc<dyn PortDriver>) -> Self {
        Self {
            driver,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Register a port by name.
    ///
    /// Appends a new identifier at the tail of the collection. Registering
    /// a name that is already present is silently ignored; registration is
    /// idempotent by design.
    pub fn register(&self, name: &str, kind: PortKind) {
        self.insert(name, kind, None);
    }

    /// Register a port together with a pre-opened transport.
    ///
    /// The cached transport is reused by the first acquire instead of a
    /// fresh driver open. Same idempotence as [`register`](Self::register).
    pub fn register_with_transport(
        &self,
        name: &str,
        kind: PortKind,
        transport: TransportHandle,
    ) {
        self.insert(name, kind, Some(transport));
    }

    fn insert(&self, name: &str, kind: PortKind, transport: Option<TransportHandle>) {
        let mut entries = self.entries.lock();
        if entries.map.contains_key(name) {
            trace!(port = name, "already registered; ignoring");
            return;
        }
        debug!(port = name, %kind, "registering port");
        let id = PortIdentifier::new(
            name.to_string(),
            kind,
            Arc::clone(&self.driver),
            transport,
        );
        entries.map.insert(name.to_string(), id);
    }

    /// Find an identifier by port name.
    ///
    /// # Errors
    ///
    /// `PortNotFound` if no port with that name is registered.
    pub fn lookup_by_name(&self, name: &str) -> Result<Arc<PortIdentifier>, RegistryError> {
        self.ensure_populated();
        self.entries
            .lock()
            .map
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(name))
    }

    /// Map an open transport back to its identifier.
    ///
    /// Scans in insertion order, comparing live handles by pointer identity.
    ///
    /// # Errors
    ///
    /// `PortNotFound` if no entry currently holds this transport.
    pub fn lookup_by_transport(
        &self,
        transport: &TransportHandle,
    ) -> Result<Arc<PortIdentifier>, RegistryError> {
        self.ensure_populated();
        self.entries
            .lock()
            .map
            .values()
            .find(|id| id.transport_matches(transport))
            .cloned()
            .ok_or_else(|| RegistryError::not_found(transport.lock().name()))
    }

    /// Snapshot of all identifiers, in registration order.
    ///
    /// The returned vector is a one-shot view: later registry mutations do
    /// not affect it.
    pub fn identifiers(&self) -> Vec<Arc<PortIdentifier>> {
        self.ensure_populated();
        self.entries.lock().map.values().cloned().collect()
    }

    /// Number of registered ports.
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().map.is_empty()
    }

    /// Discard the collection and rebuild it from driver discovery.
    ///
    /// Discovery runs outside the registry lock; the collection is then
    /// swapped wholesale and a snapshot of the new entries is returned.
    /// Every dropped identifier is revoked: if it was still owned, the
    /// binding is force-released (waking any blocked acquirers) and
    /// `OwnershipUnowned` is fired before the entry is dropped.
    pub fn refresh(&self) -> Vec<Arc<PortIdentifier>> {
        let discovered = self.driver.discover();
        debug!(count = discovered.len(), "rebuilding registry from discovery");

        let mut fresh: IndexMap<String, Arc<PortIdentifier>> =
            IndexMap::with_capacity(discovered.len());
        for (name, kind) in discovered {
            if fresh.contains_key(&name) {
                continue;
            }
            let id = PortIdentifier::new(
                name.clone(),
                kind,
                Arc::clone(&self.driver),
                None,
            );
            fresh.insert(name, id);
        }
        let snapshot: Vec<Arc<PortIdentifier>> = fresh.values().cloned().collect();

        let dropped = {
            let mut entries = self.entries.lock();
            entries.populated = true;
            std::mem::replace(&mut entries.map, fresh)
        };

        // Revocation notifies listeners, so it happens with the registry
        // lock released.
        for id in dropped.values() {
            id.revoke();
        }

        snapshot
    }

    /// Run initial discovery once, merging discovered ports after any
    /// manually registered ones. Unlike `refresh`, nothing is dropped.
    fn ensure_populated(&self) {
        if self.entries.lock().populated {
            return;
        }
        let discovered = self.driver.discover();
        let mut entries = self.entries.lock();
        if entries.populated {
            // Another thread won the race.
            return;
        }
        for (name, kind) in discovered {
            if entries.map.contains_key(&name) {
                continue;
            }
            let id = PortIdentifier::new(
                name.clone(),
                kind,
                Arc::clone(&self.driver),
                None,
            );
            entries.map.insert(name, id);
        }
        entries.populated = true;
    }
}

impl std::fmt::Debug for PortRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortRegistry")
            .field("len", &self.len())
            .field("driver", &self.driver)
            .finish()
    }
}
