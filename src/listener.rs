//! Ownership-change events and subscriber plumbing.
//!
//! Every `PortIdentifier` carries a `ListenerSet`: an ordered,
//! identity-deduplicated collection of subscribers that are told when the
//! port's exclusive-access state changes. Delivery is synchronous, on the
//! thread that triggered the transition, and always happens after the
//! identifier's state lock has been released so a listener may call back
//! into acquire/release without deadlocking.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

/// A change in a port's exclusive-access state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipEvent {
    /// Another session wants the port; a hint to the incumbent to release.
    Requested,
    /// The port was just acquired.
    Owned,
    /// The port was just released.
    Unowned,
}

/// Callback interface for ownership-change notification.
///
/// Implementations must be thread-safe: events are delivered from whichever
/// thread performed the acquire or release. A panicking listener is isolated
/// at the notification boundary and never corrupts arbiter state.
pub trait OwnershipListener: Send + Sync {
    /// Called with the port's name and the event that just occurred.
    fn ownership_changed(&self, port: &str, event: OwnershipEvent);
}

/// Ordered set of ownership-change subscribers.
///
/// Membership is identity-based: the same `Arc` subscribed twice is stored
/// once, and notified once per event. Subscription order is preserved for
/// delivery.
#[derive(Default)]
pub struct ListenerSet {
    subscribers: Vec<Arc<dyn OwnershipListener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber unless the same one (by identity) is already present.
    pub fn subscribe(&mut self, listener: &Arc<dyn OwnershipListener>) {
        if !self.subscribers.iter().any(|l| Arc::ptr_eq(l, listener)) {
            self.subscribers.push(Arc::clone(listener));
        }
    }

    /// Remove a subscriber; removing one that is not present is a no-op.
    pub fn unsubscribe(&mut self, listener: &Arc<dyn OwnershipListener>) {
        self.subscribers.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Copy of the current subscriber list, in subscription order.
    ///
    /// Notification works on a snapshot so the set can be mutated while an
    /// event is being delivered.
    pub fn snapshot(&self) -> Vec<Arc<dyn OwnershipListener>> {
        self.subscribers.clone()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Deliver `event` to every subscriber in the snapshot, in order.
///
/// A panic in one listener is caught, logged, and does not prevent delivery
/// to the remaining subscribers.
pub(crate) fn deliver(
    subscribers: &[Arc<dyn OwnershipListener>],
    port: &str,
    event: OwnershipEvent,
) {
    if subscribers.is_empty() {
        return;
    }
    trace!(port, ?event, count = subscribers.len(), "notifying listeners");
    for listener in subscribers {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            listener.ownership_changed(port, event);
        }));
        if outcome.is_err() {
            warn!(port, ?event, "ownership listener panicked during notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        events: Mutex<Vec<(String, OwnershipEvent)>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<(String, OwnershipEvent)> {
            self.events.lock().clone()
        }
    }

    impl OwnershipListener for Recorder {
        fn ownership_changed(&self, port: &str, event: OwnershipEvent) {
            self.events.lock().push((port.to_string(), event));
        }
    }

    struct Panicker;

    impl OwnershipListener for Panicker {
        fn ownership_changed(&self, _port: &str, _event: OwnershipEvent) {
            panic!("listener blew up");
        }
    }

    #[test]
    fn test_duplicate_subscription_notified_once() {
        let recorder = Recorder::new();
        let handle: Arc<dyn OwnershipListener> = recorder.clone();

        let mut set = ListenerSet::new();
        set.subscribe(&handle);
        set.subscribe(&handle);
        assert_eq!(set.len(), 1);

        deliver(&set.snapshot(), "COM1", OwnershipEvent::Owned);
        assert_eq!(recorder.seen().len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let first = Recorder::new();
        let second = Recorder::new();
        let first_handle: Arc<dyn OwnershipListener> = first.clone();
        let second_handle: Arc<dyn OwnershipListener> = second.clone();

        let mut set = ListenerSet::new();
        set.subscribe(&first_handle);
        set.subscribe(&second_handle);
        set.unsubscribe(&first_handle);

        deliver(&set.snapshot(), "COM1", OwnershipEvent::Unowned);
        assert!(first.seen().is_empty());
        assert_eq!(second.seen().len(), 1);
    }

    #[test]
    fn test_unsubscribe_absent_is_noop() {
        let recorder = Recorder::new();
        let handle: Arc<dyn OwnershipListener> = recorder.clone();

        let mut set = ListenerSet::new();
        set.unsubscribe(&handle);
        assert!(set.is_empty());
    }

    #[test]
    fn test_delivery_order_matches_subscription_order() {
        let shared = Recorder::new();

        struct Tagged {
            tag: &'static str,
            log: Arc<Recorder>,
        }
        impl OwnershipListener for Tagged {
            fn ownership_changed(&self, _port: &str, event: OwnershipEvent) {
                self.log.events.lock().push((self.tag.to_string(), event));
            }
        }

        let a: Arc<dyn OwnershipListener> = Arc::new(Tagged {
            tag: "a",
            log: shared.clone(),
        });
        let b: Arc<dyn OwnershipListener> = Arc::new(Tagged {
            tag: "b",
            log: shared.clone(),
        });

        let mut set = ListenerSet::new();
        set.subscribe(&a);
        set.subscribe(&b);
        deliver(&set.snapshot(), "COM1", OwnershipEvent::Requested);

        let order: Vec<String> = shared.seen().into_iter().map(|(tag, _)| tag).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let panicker: Arc<dyn OwnershipListener> = Arc::new(Panicker);
        let recorder = Recorder::new();
        let recorder_handle: Arc<dyn OwnershipListener> = recorder.clone();

        let mut set = ListenerSet::new();
        set.subscribe(&panicker);
        set.subscribe(&recorder_handle);

        deliver(&set.snapshot(), "COM1", OwnershipEvent::Owned);
        assert_eq!(recorder.seen().len(), 1, "later listeners still notified");
    }
}
