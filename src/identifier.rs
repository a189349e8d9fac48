//! Port identity and the per-port ownership arbiter.
//!
//! A `PortIdentifier` is the named, discoverable handle to a communication
//! port, independent of whether it is currently open. Its immutable identity
//! (name, kind) is paired with a small ownership state machine guarded by
//! one mutex/condvar pair per identifier: acquire either wins immediately,
//! blocks the calling thread for a bounded contention window, or fails with
//! a precise error. Different identifiers never interact.

use crate::driver::{PortDriver, PortKind, TransportHandle};
use crate::error::RegistryError;
use crate::listener::{self, ListenerSet, OwnershipEvent, OwnershipListener};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// How long `acquire` may block when the port is already owned.
///
/// The no-wait and block-forever cases are explicit variants rather than
/// sentinel durations, so a caller can never block forever by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireTimeout {
    /// Fail immediately with `PortInUse` if the port is owned.
    NoWait,
    /// Block for at most this long, then fail with `PortInUse`.
    Bounded(Duration),
    /// Block until the port is released or revoked.
    Forever,
}

impl AcquireTimeout {
    /// Millisecond convenience constructor; `0` means do not block.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::NoWait
        } else {
            Self::Bounded(Duration::from_millis(ms))
        }
    }
}

/// The ownership triple, mutated only under the identifier's state lock.
#[derive(Debug, Default)]
struct OwnershipState {
    /// Label of the session currently holding the port, `None` when unowned.
    owner: Option<String>,
    /// Open transport. May remain cached while unowned for identifiers
    /// registered with a pre-opened transport; cleared on release.
    transport: Option<TransportHandle>,
    /// Set when the identifier is dropped from the registry by a refresh.
    /// A revoked identifier can never be acquired again.
    revoked: bool,
}

/// Named port identity plus single-owner arbitration.
///
/// Identifiers are handed out as `Arc`s by the registry; they stay valid
/// (but become revoked) if a refresh drops them from the collection.
pub struct PortIdentifier {
    name: String,
    kind: PortKind,
    driver: Arc<dyn PortDriver>,
    state: Mutex<OwnershipState>,
    /// Signalled whenever the port may have become available.
    available: Condvar,
    listeners: Mutex<ListenerSet>,
}

impl PortIdentifier {
    pub(crate) fn new(
        name: String,
        kind: PortKind,
        driver: Arc<dyn PortDriver>,
        transport: Option<TransportHandle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            kind,
            driver,
            state: Mutex::new(OwnershipState {
                transport,
                ..Default::default()
            }),
            available: Condvar::new(),
            listeners: Mutex::new(ListenerSet::new()),
        })
    }

    /// The port's unique name within the registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of port this identifier refers to.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Whether the port currently has an owner.
    pub fn is_owned(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Whether the port can be acquired right now without contending.
    pub fn is_available(&self) -> bool {
        let state = self.state.lock();
        state.owner.is_none() && !state.revoked
    }

    /// Label of the current owner, if any.
    pub fn current_owner(&self) -> Option<String> {
        self.state.lock().owner.clone()
    }

    /// Subscribe to ownership-change events. Subscribing the same listener
    /// twice has no effect.
    pub fn subscribe(&self, listener: &Arc<dyn OwnershipListener>) {
        self.listeners.lock().subscribe(listener);
    }

    /// Unsubscribe a listener; a no-op if it was never subscribed.
    pub fn unsubscribe(&self, listener: &Arc<dyn OwnershipListener>) {
        self.listeners.lock().unsubscribe(listener);
    }

    /// Claim exclusive use of the port for `owner`.
    ///
    /// If the port is unowned this succeeds immediately. If it is owned, an
    /// `OwnershipRequested` event is fired as a hint to the incumbent, then
    /// the calling thread blocks on the identifier's condition for up to
    /// `timeout`. A woken thread re-checks availability and may still lose
    /// the race to a newly-arrived acquirer; no fairness is guaranteed and
    /// starvation is possible under sustained contention.
    ///
    /// On success the transport comes from the cached handle if one exists,
    /// otherwise from the driver. The driver call happens inside the
    /// identifier's critical section so two threads can never race to open
    /// the same port.
    ///
    /// # Errors
    ///
    /// - `PortInUse` if the port is still owned when the window closes
    /// - `PortUnavailable` if the driver failed to open but the device exists
    /// - `PortVanished` if the device is confirmed absent, or this
    ///   identifier was dropped from the registry by a refresh
    pub fn acquire(
        &self,
        owner: &str,
        timeout: AcquireTimeout,
    ) -> Result<TransportHandle, RegistryError> {
        trace!(port = %self.name, owner, ?timeout, "acquire");
        let mut state = self.state.lock();
        if state.revoked {
            return Err(RegistryError::vanished(&self.name));
        }

        if state.owner.is_some() {
            // Hint the incumbent to let go, then wait out the contention
            // window. The hint is delivered outside the state lock so a
            // listener may release the port from this very callback.
            drop(state);
            let subscribers = self.listeners.lock().snapshot();
            listener::deliver(&subscribers, &self.name, OwnershipEvent::Requested);
            state = self.state.lock();

            match timeout {
                AcquireTimeout::NoWait => {}
                AcquireTimeout::Bounded(window) => {
                    // A window too large to represent as a deadline degrades
                    // to an unbounded wait.
                    match Instant::now().checked_add(window) {
                        Some(deadline) => {
                            while state.owner.is_some() && !state.revoked {
                                if self.available.wait_until(&mut state, deadline).timed_out() {
                                    break;
                                }
                            }
                        }
                        None => {
                            while state.owner.is_some() && !state.revoked {
                                self.available.wait(&mut state);
                            }
                        }
                    }
                }
                AcquireTimeout::Forever => {
                    while state.owner.is_some() && !state.revoked {
                        self.available.wait(&mut state);
                    }
                }
            }

            if state.revoked {
                return Err(RegistryError::vanished(&self.name));
            }
            if let Some(current) = &state.owner {
                debug!(port = %self.name, owner, current = %current, "acquire lost contention");
                return Err(RegistryError::in_use(&self.name, current));
            }
        }

        let cached = state.transport.clone();
        let transport = match cached {
            Some(cached) => cached,
            None => match self.driver.open(&self.name, self.kind) {
                Ok(handle) => handle,
                Err(err) => {
                    drop(state);
                    if !self.driver.device_exists(&self.name) {
                        warn!(port = %self.name, "device vanished from the system");
                        return Err(RegistryError::vanished(&self.name));
                    }
                    return Err(RegistryError::PortUnavailable {
                        port: self.name.clone(),
                        source: err,
                    });
                }
            },
        };

        state.owner = Some(owner.to_string());
        state.transport = Some(Arc::clone(&transport));
        drop(state);

        debug!(port = %self.name, owner, "port acquired");
        let subscribers = self.listeners.lock().snapshot();
        listener::deliver(&subscribers, &self.name, OwnershipEvent::Owned);
        Ok(transport)
    }

    /// Return the port to the unowned state.
    ///
    /// Clears the owner and the transport handle, wakes every thread blocked
    /// in `acquire` on this identifier, and fires `OwnershipUnowned`.
    /// Releasing an unowned port is a no-op.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.owner.take().is_none() {
            return;
        }
        state.transport = None;
        drop(state);

        self.available.notify_all();
        debug!(port = %self.name, "port released");
        let subscribers = self.listeners.lock().snapshot();
        listener::deliver(&subscribers, &self.name, OwnershipEvent::Unowned);
    }

    /// Permanently invalidate this identifier.
    ///
    /// Used by the registry when a refresh drops the entry: the binding is
    /// force-released, waiters are woken (they will observe `PortVanished`),
    /// and `OwnershipUnowned` is fired if the port was owned. Returns
    /// whether the port had an owner.
    pub(crate) fn revoke(&self) -> bool {
        let mut state = self.state.lock();
        let was_owned = state.owner.take().is_some();
        state.transport = None;
        state.revoked = true;
        drop(state);

        self.available.notify_all();
        if was_owned {
            warn!(port = %self.name, "owned port dropped from registry; binding force-released");
            let subscribers = self.listeners.lock().snapshot();
            listener::deliver(&subscribers, &self.name, OwnershipEvent::Unowned);
        }
        was_owned
    }

    /// Whether `handle` is the transport currently bound to this identifier.
    pub(crate) fn transport_matches(&self, handle: &TransportHandle) -> bool {
        self.state
            .lock()
            .transport
            .as_ref()
            .is_some_and(|t| Arc::ptr_eq(t, handle))
    }
}

impl std::fmt::Debug for PortIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PortIdentifier")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("owner", &state.owner)
            .field("revoked", &state.revoked)
            .finish()
    }
}
