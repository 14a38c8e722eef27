mod common;

use camhub::{HubError, WAIT_FOREVER};
use common::{backend, cam, hub, polling_hub};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn times_out_after_full_timeout() {
    let backend = backend(&[]);
    let manager = hub(&backend);

    let start = Instant::now();
    let err = manager.wait_for_device(200, true, "").unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, HubError::Timeout { timeout_ms: 200 }));
    assert!(elapsed >= Duration::from_millis(200), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(700), "overshoot: {elapsed:?}");
}

#[test]
fn present_device_returns_immediately() {
    let backend = backend(&["A"]);
    let manager = hub(&backend);

    let start = Instant::now();
    let dev = manager.wait_for_device(5_000, true, "A").unwrap().unwrap();
    assert_eq!(dev.fingerprint(), &cam("A").fingerprint);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn attach_wakes_blocked_waiter() {
    let backend = backend(&[]);
    let manager = hub(&backend);

    let (result, elapsed) = thread::scope(|s| {
        let waiter = s.spawn(|| {
            let start = Instant::now();
            let result = manager.wait_for_device(5_000, true, "ABC123");
            (result, start.elapsed())
        });
        thread::sleep(Duration::from_millis(50));
        backend.attach(cam("ABC123"));
        waiter.join().unwrap()
    });

    let dev = result.unwrap().unwrap();
    assert_eq!(dev.fingerprint().serial_number.as_deref(), Some("ABC123"));
    assert!(elapsed < Duration::from_millis(2_000), "woke late: {elapsed:?}");
}

#[test]
fn unrelated_attach_does_not_satisfy_serial_waiter() {
    let backend = backend(&[]);
    let manager = hub(&backend);

    let result = thread::scope(|s| {
        let waiter = s.spawn(|| manager.wait_for_device(300, true, "WANTED"));
        thread::sleep(Duration::from_millis(30));
        backend.attach(cam("OTHER"));
        waiter.join().unwrap()
    });

    assert!(matches!(result, Err(HubError::Timeout { .. })));
}

#[test]
fn every_waiter_sees_its_own_device() {
    let backend = backend(&[]);
    let manager = hub(&backend);
    let serials = ["A", "B", "C"];

    let got: Vec<String> = thread::scope(|s| {
        let waiters: Vec<_> = serials
            .iter()
            .map(|serial| {
                let manager = &manager;
                s.spawn(move || manager.wait_for_device(5_000, true, serial))
            })
            .collect();
        thread::sleep(Duration::from_millis(50));
        for serial in serials.iter().rev() {
            backend.attach(cam(serial));
        }
        waiters
            .into_iter()
            .map(|w| {
                let dev = w.join().unwrap().unwrap().unwrap();
                dev.fingerprint().serial_number.clone().unwrap()
            })
            .collect()
    });

    assert_eq!(got, serials);
}

#[test]
fn wait_forever_is_satisfied_by_attach() {
    let backend = backend(&[]);
    let manager = hub(&backend);

    let result = thread::scope(|s| {
        let waiter = s.spawn(|| manager.wait_for_device(WAIT_FOREVER, false, ""));
        thread::sleep(Duration::from_millis(30));
        backend.attach(cam("A"));
        waiter.join().unwrap()
    });

    assert!(result.unwrap().is_some());
}

#[test]
fn detach_during_wait_times_out_at_deadline() {
    // ABC123 is enumerated but cannot be opened, then disappears 5 ms in.
    let backend = backend(&["ABC123"]);
    backend.set_unavailable(&cam("ABC123").fingerprint, true);
    let manager = hub(&backend);

    let (result, elapsed) = thread::scope(|s| {
        let waiter = s.spawn(|| {
            let start = Instant::now();
            let result = manager.wait_for_device(1_000, true, "ABC123");
            (result, start.elapsed())
        });
        thread::sleep(Duration::from_millis(5));
        backend.detach("ABC123");
        waiter.join().unwrap()
    });

    assert!(matches!(result, Err(HubError::Timeout { timeout_ms: 1_000 })));
    assert!(elapsed >= Duration::from_millis(1_000), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1_600), "overshoot: {elapsed:?}");
}

#[test]
fn busy_device_is_retried_until_it_opens() {
    let backend = backend(&["A"]);
    let fp = cam("A").fingerprint;
    backend.set_unavailable(&fp, true);
    let manager = hub(&backend);

    let result = thread::scope(|s| {
        let waiter = s.spawn(|| manager.wait_for_device(3_000, true, "A"));
        thread::sleep(Duration::from_millis(150));
        // No hotplug event: the waiter has to retry on its own.
        backend.set_unavailable(&fp, false);
        waiter.join().unwrap()
    });

    assert!(result.unwrap().is_some());
}

#[test]
fn busy_device_is_skipped_when_looping() {
    let backend = backend(&["A", "B"]);
    backend.set_unavailable(&cam("A").fingerprint, true);
    let manager = hub(&backend);

    let dev = manager.wait_for_device(2_000, true, "").unwrap().unwrap();
    assert_eq!(dev.fingerprint().serial_number.as_deref(), Some("B"));
}

#[test]
fn polling_hub_notices_attach_without_notifications() {
    let backend = backend(&[]);
    let manager = polling_hub(&backend, 20);
    assert!(!manager.notifications_enabled());
    assert_eq!(backend.subscriber_count(), 0);

    let (result, elapsed) = thread::scope(|s| {
        let waiter = s.spawn(|| {
            let start = Instant::now();
            let result = manager.wait_for_device(3_000, true, "A");
            (result, start.elapsed())
        });
        thread::sleep(Duration::from_millis(50));
        backend.attach(cam("A"));
        waiter.join().unwrap()
    });

    assert!(result.unwrap().is_some());
    assert!(elapsed < Duration::from_millis(1_500), "woke late: {elapsed:?}");
}

#[test]
fn polling_hub_propagates_subsystem_failure() {
    let backend = backend(&[]);
    let manager = polling_hub(&backend, 10);
    backend.set_enumeration_failure(true);

    let err = manager.wait_for_device(1_000, true, "").unwrap_err();
    assert!(matches!(err, HubError::SubsystemUnavailable { .. }));
}

#[test]
fn polling_hub_still_honours_timeout() {
    let backend = backend(&[]);
    let manager = polling_hub(&backend, 15);

    let start = Instant::now();
    let err = manager.wait_for_device(120, true, "").unwrap_err();
    assert!(matches!(err, HubError::Timeout { .. }));
    assert!(start.elapsed() >= Duration::from_millis(120));
    assert!(backend.enumeration_count() > 2, "waiter should have re-polled");
}

#[test]
fn shutdown_releases_blocked_waiters() {
    let backend = backend(&[]);
    let manager = hub(&backend);

    let (result, elapsed) = thread::scope(|s| {
        let waiter = s.spawn(|| {
            let start = Instant::now();
            let result = manager.wait_for_device(WAIT_FOREVER, true, "");
            (result, start.elapsed())
        });
        thread::sleep(Duration::from_millis(50));
        manager.shutdown();
        waiter.join().unwrap()
    });

    assert!(matches!(result, Err(HubError::Shutdown)));
    assert!(elapsed < Duration::from_secs(2));
    assert!(backend.is_stopped());
    assert_eq!(backend.subscriber_count(), 0);
}

#[test]
fn concurrent_round_robin_hands_out_every_device() {
    let backend = backend(&["A", "B", "C", "D"]);
    let manager = hub(&backend);

    let mut got: Vec<String> = thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| s.spawn(|| manager.wait_for_device(1_000, true, "").unwrap().unwrap()))
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().unwrap().fingerprint().serial_number.clone().unwrap())
            .collect()
    });
    got.sort();

    assert_eq!(got, ["A", "B", "C", "D"]);
}

#[test]
fn polling_hub_non_blocking_call_sees_fresh_devices() {
    let backend = backend(&[]);
    let manager = polling_hub(&backend, 20);

    backend.attach(cam("A"));
    let dev = manager.wait_for_device(0, true, "A").unwrap();
    assert!(dev.is_some());
    assert_eq!(manager.devices().len(), 1);

    backend.detach("A");
    assert!(manager.try_device(true, "A").unwrap().is_none());
    assert!(manager.devices().is_empty());
}

#[test]
fn subsystem_failure_reaches_callers_with_notifications() {
    let backend = backend(&["A"]);
    let manager = hub(&backend);
    backend.set_enumeration_failure(true);

    let err = manager.wait_for_device(0, true, "").unwrap_err();
    assert!(matches!(err, HubError::SubsystemUnavailable { .. }));

    let start = Instant::now();
    let err = manager.wait_for_device(200, true, "missing").unwrap_err();
    assert!(matches!(err, HubError::SubsystemUnavailable { .. }));
    assert!(start.elapsed() < Duration::from_millis(150));

    backend.set_enumeration_failure(false);
    assert!(manager.wait_for_device(0, true, "A").unwrap().is_some());
}
