//! Multi-threaded ownership arbitration tests.
//!
//! Exercises the acquire/contend/release protocol across real threads:
//! immediate wins, bounded contention windows, wake-on-release, and
//! revocation of blocked waiters.

use parking_lot::Mutex;
use serial_registry::driver::MockDriver;
use serial_registry::{
    AcquireTimeout, OwnershipEvent, OwnershipListener, PortKind, PortRegistry, RegistryError,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

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

fn registry_with(ports: &[&str]) -> (PortRegistry, MockDriver) {
    let driver = MockDriver::with_ports(ports);
    (PortRegistry::new(Arc::new(driver.clone())), driver)
}

#[test]
fn alice_then_bob_scenario() {
    // register "A"; acquire("alice", 0) wins; acquire("bob", 0) fails with
    // PortInUse{alice}; release; acquire("bob", 0) wins.
    let (registry, _driver) = registry_with(&[]);
    registry.register("A", PortKind::Serial);

    let port = registry.lookup_by_name("A").unwrap();
    port.acquire("alice", AcquireTimeout::NoWait).unwrap();

    match port.acquire("bob", AcquireTimeout::NoWait) {
        Err(RegistryError::PortInUse { port, owner }) => {
            assert_eq!(port, "A");
            assert_eq!(owner, "alice");
        }
        other => panic!("expected PortInUse{{alice}}, got {other:?}"),
    }

    port.release();
    port.acquire("bob", AcquireTimeout::NoWait).unwrap();
    assert_eq!(port.current_owner().as_deref(), Some("bob"));
}

#[test]
fn racing_nowait_acquires_have_exactly_one_winner() {
    let (registry, _driver) = registry_with(&["COM1"]);
    let port = registry.lookup_by_name("COM1").unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for label in ["t1", "t2"] {
        let port = Arc::clone(&port);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            port.acquire(label, AcquireTimeout::NoWait).is_ok()
        }));
    }

    let wins: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(wins.iter().filter(|w| **w).count(), 1);
    assert!(port.is_owned());
}

#[test]
fn blocked_acquirer_wins_after_release_within_window() {
    let (registry, _driver) = registry_with(&["COM1"]);
    let port = registry.lookup_by_name("COM1").unwrap();
    port.acquire("alice", AcquireTimeout::NoWait).unwrap();

    let contender = {
        let port = Arc::clone(&port);
        thread::spawn(move || port.acquire("bob", AcquireTimeout::Bounded(Duration::from_secs(5))))
    };

    // Give the contender time to enter its wait, then hand the port over.
    thread::sleep(Duration::from_millis(100));
    port.release();

    let result = contender.join().unwrap();
    assert!(result.is_ok(), "waiter should win once released: {result:?}");
    assert_eq!(port.current_owner().as_deref(), Some("bob"));
}

#[test]
fn unrepresentable_bounded_window_waits_instead_of_failing() {
    // Duration::MAX is a legal window; it cannot be turned into a deadline,
    // so it must behave like an unbounded wait rather than blow up.
    let (registry, _driver) = registry_with(&["COM1"]);
    let port = registry.lookup_by_name("COM1").unwrap();
    port.acquire("alice", AcquireTimeout::NoWait).unwrap();

    let contender = {
        let port = Arc::clone(&port);
        thread::spawn(move || port.acquire("bob", AcquireTimeout::Bounded(Duration::MAX)))
    };

    thread::sleep(Duration::from_millis(100));
    port.release();

    let result = contender.join().unwrap();
    assert!(result.is_ok(), "waiter should win once released: {result:?}");
    assert_eq!(port.current_owner().as_deref(), Some("bob"));
}

#[test]
fn release_wakes_all_waiters_but_only_one_wins() {
    let (registry, _driver) = registry_with(&["COM1"]);
    let port = registry.lookup_by_name("COM1").unwrap();
    port.acquire("alice", AcquireTimeout::NoWait).unwrap();

    let barrier = Arc::new(Barrier::new(3));
    let mut handles = Vec::new();
    for label in ["bob", "carol"] {
        let port = Arc::clone(&port);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            port.acquire(label, AcquireTimeout::Bounded(Duration::from_millis(500)))
        }));
    }

    barrier.wait();
    thread::sleep(Duration::from_millis(100));
    port.release();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one waiter may claim the port");
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(err, RegistryError::PortInUse { .. }));
        }
    }
}

#[test]
fn contended_bounded_acquire_times_out_with_incumbent_label() {
    let (registry, _driver) = registry_with(&["COM1"]);
    let port = registry.lookup_by_name("COM1").unwrap();
    port.acquire("alice", AcquireTimeout::NoWait).unwrap();

    let err = port
        .acquire("bob", AcquireTimeout::Bounded(Duration::from_millis(50)))
        .unwrap_err();
    match err {
        RegistryError::PortInUse { owner, .. } => assert_eq!(owner, "alice"),
        other => panic!("expected PortInUse, got {other:?}"),
    }
    // The incumbent is untouched by the failed attempt.
    assert_eq!(port.current_owner().as_deref(), Some("alice"));
}

#[test]
fn refresh_revocation_wakes_forever_waiter() {
    let (registry, driver) = registry_with(&["COM1"]);
    let registry = Arc::new(registry);
    let port = registry.lookup_by_name("COM1").unwrap();
    port.acquire("alice", AcquireTimeout::NoWait).unwrap();

    let waiter = {
        let port = Arc::clone(&port);
        thread::spawn(move || port.acquire("bob", AcquireTimeout::Forever))
    };

    thread::sleep(Duration::from_millis(100));
    driver.set_ports(&[]);
    registry.refresh();

    let result = waiter.join().unwrap();
    assert!(
        matches!(result, Err(RegistryError::PortVanished { .. })),
        "revoked identifier must fail waiters with PortVanished: {result:?}"
    );
}

#[test]
fn ownership_events_are_observed_across_threads() {
    let (registry, _driver) = registry_with(&["COM1"]);
    let port = registry.lookup_by_name("COM1").unwrap();

    let recorder = Recorder::new();
    let handle: Arc<dyn OwnershipListener> = recorder.clone();
    port.subscribe(&handle);

    let worker = {
        let port = Arc::clone(&port);
        thread::spawn(move || {
            port.acquire("alice", AcquireTimeout::NoWait).unwrap();
            port.release();
        })
    };
    worker.join().unwrap();

    let events: Vec<OwnershipEvent> = recorder.seen().into_iter().map(|(_, e)| e).collect();
    assert_eq!(events, vec![OwnershipEvent::Owned, OwnershipEvent::Unowned]);
}

#[test]
fn failed_acquire_leaves_port_acquirable() {
    let (registry, driver) = registry_with(&["COM1"]);
    let port = registry.lookup_by_name("COM1").unwrap();

    driver.fail_open("COM1");
    let err = port.acquire("alice", AcquireTimeout::NoWait).unwrap_err();
    assert!(matches!(err, RegistryError::PortUnavailable { .. }));
    assert!(!port.is_owned());
}
