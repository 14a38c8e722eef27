//! Hotplug-aware device hub.
//!
//! [`DeviceManager`] keeps the authoritative list of present devices (a
//! [`Snapshot`]) and lets any number of threads either look a device up right
//! now or block until one shows up.
//!
//! # Registry
//! The snapshot, the round-robin cursor, a refresh generation counter and the
//! shutdown flag live behind one mutex. A refresh enumerates the backend outside
//! that mutex, swaps the snapshot in under it, and broadcasts on the condition
//! variable before unlocking. Refreshes are serialized, so a slow enumeration can
//! never overwrite the result of a newer one.
//!
//! # Waiting
//! Each call starts with a refresh, so it sees the backend's current list even
//! when no notification has arrived, and a dead backend surfaces as an error.
//! Waiters then check their predicate and go to sleep under the same mutex, so a
//! refresh that lands between the check and the wait is never lost. Every
//! refresh wakes every waiter; each re-runs its own selection. With hotplug
//! notifications disabled, waiters wake at least every `poll_interval` and
//! refresh the registry themselves.
//!
//! # Shutdown
//! [`DeviceManager::shutdown`] (also run on drop) marks the registry closed,
//! wakes all waiters so they fail with [`HubError::Shutdown`], unsubscribes and
//! stops the backend's notification delivery.

use crate::backends::Backend;
use crate::config::{HubConfig, VendorFilter};
use crate::device::{Device, DeviceDescriptor, DeviceHandle};
use crate::error::HubError;
use crate::event::DeviceEvent;
use crate::eventbus::SubscriptionId;
use crate::snapshot::Snapshot;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// `timeout_ms` value that blocks without a deadline.
pub const WAIT_FOREVER: u32 = u32::MAX;

/// Upper bound for a single condition-variable sleep.
const MAX_SLICE: Duration = Duration::from_secs(3600);

struct Registry {
    snapshot: Snapshot,
    cursor: usize,
    generation: u64,
    shutdown: bool,
}

struct Shared {
    backend: Arc<dyn Backend>,
    filter: VendorFilter,
    registry: Mutex<Registry>,
    changed: Condvar,
    refresh_serial: Mutex<()>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self) -> Result<(), HubError> {
        let _serial = self
            .refresh_serial
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut devices = self.backend.enumerate(self.filter)?;
        devices.retain(|d| self.filter.matches(d.vendor_id()));
        let count = devices.len();

        let mut registry = self.lock();
        registry.snapshot = Snapshot::new(devices);
        registry.generation = registry.generation.wrapping_add(1);
        self.changed.notify_all();
        let generation = registry.generation;
        drop(registry);

        debug!(devices = count, generation, "registry refreshed");
        Ok(())
    }
}

pub struct DeviceManager {
    shared: Arc<Shared>,
    subscription: Mutex<Option<SubscriptionId>>,
    register_notifications: bool,
    poll_interval: Duration,
}

impl DeviceManager {
    /// Build a hub on `backend`.
    ///
    /// `vendor_id == 0` accepts every vendor. With `register_device_notifications`
    /// the hub refreshes on every backend hotplug event; without it, blocked
    /// waiters poll.
    pub fn new(
        backend: Arc<dyn Backend>,
        vendor_id: u16,
        register_device_notifications: bool,
    ) -> Result<Self, HubError> {
        let config = HubConfig {
            vendor_id,
            register_notifications: register_device_notifications,
            ..HubConfig::default()
        };
        Self::with_config(backend, &config)
    }

    pub fn with_config(backend: Arc<dyn Backend>, config: &HubConfig) -> Result<Self, HubError> {
        let shared = Arc::new(Shared {
            backend: Arc::clone(&backend),
            filter: config.vendor_filter(),
            registry: Mutex::new(Registry {
                snapshot: Snapshot::default(),
                cursor: 0,
                generation: 0,
                shutdown: false,
            }),
            changed: Condvar::new(),
            refresh_serial: Mutex::new(()),
        });

        // Subscribe before the first enumeration so no event can fall in between.
        let subscription = config.register_notifications.then(|| {
            let weak = Arc::downgrade(&shared);
            backend.subscribe(Arc::new(move |event: &DeviceEvent| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if shared.lock().shutdown {
                    return;
                }
                debug!(kind = ?event.kind, device = %event.fingerprint, "hotplug event");
                if let Err(e) = shared.refresh() {
                    warn!(error = %e, "refresh after hotplug event failed");
                }
            }))
        });

        let manager = Self {
            shared,
            subscription: Mutex::new(subscription),
            register_notifications: config.register_notifications,
            poll_interval: config.poll_interval(),
        };
        // On failure `manager` drops here, which unsubscribes and stops the backend.
        manager.shared.refresh()?;

        info!(
            filter = ?manager.shared.filter,
            notifications = manager.register_notifications,
            devices = manager.shared.lock().snapshot.len(),
            "device hub ready"
        );
        Ok(manager)
    }

    /// Find a device, optionally waiting for one to be connected.
    ///
    /// Every call re-enumerates the backend first; a backend that cannot be
    /// queried fails the call with [`HubError::SubsystemUnavailable`].
    ///
    /// - `timeout_ms == 0`: select once. Returns `Ok(None)` when nothing matches
    ///   (or the match could not be opened).
    /// - `timeout_ms > 0`: block until a match can be opened; fails with
    ///   [`HubError::Timeout`] once `timeout_ms` has elapsed.
    ///   [`WAIT_FOREVER`] blocks without a deadline.
    ///
    /// `serial == ""` accepts any device; otherwise the serial must match exactly.
    /// `loop_through_devices` moves the internal cursor past the returned device,
    /// so successive calls hand out every connected device in turn.
    pub fn wait_for_device(
        &self,
        timeout_ms: u32,
        loop_through_devices: bool,
        serial: &str,
    ) -> Result<Option<DeviceHandle>, HubError> {
        let deadline = (timeout_ms != WAIT_FOREVER)
            .then(|| Instant::now() + Duration::from_millis(u64::from(timeout_ms)));
        self.refresh()?;
        let mut registry = self.shared.lock();

        loop {
            if registry.shutdown {
                return Err(HubError::Shutdown);
            }
            let seen = registry.generation;

            let picked = {
                let r = &mut *registry;
                r.snapshot
                    .select(self.shared.filter, serial, loop_through_devices, &mut r.cursor)
            };

            let Some(descriptor) = picked else {
                if timeout_ms == 0 {
                    return Ok(None);
                }
                registry = self.block(registry, seen, deadline, timeout_ms, MAX_SLICE)?;
                continue;
            };

            drop(registry);
            match self.shared.backend.instantiate(&descriptor) {
                Ok(handle) => {
                    debug!(device = %descriptor, serial, "device selected");
                    return Ok(Some(handle));
                }
                Err(e) if e.is_transient() => {
                    warn!(device = %descriptor, error = %e, "matched device could not be opened");
                    if timeout_ms == 0 {
                        return Ok(None);
                    }
                    registry = self.shared.lock();
                    if registry.generation == seen && !registry.shutdown {
                        // Still enumerated but not openable: retry after the next change
                        // or one poll interval, whichever comes first.
                        registry =
                            self.block(registry, seen, deadline, timeout_ms, self.poll_interval)?;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Non-blocking lookup; same as `wait_for_device(0, ..)`.
    pub fn try_device(
        &self,
        loop_through_devices: bool,
        serial: &str,
    ) -> Result<Option<DeviceHandle>, HubError> {
        self.wait_for_device(0, loop_through_devices, serial)
    }

    /// Blocking lookup with a [`Duration`]. Sub-millisecond timeouts round up to 1 ms.
    pub fn wait_for_device_timeout(
        &self,
        timeout: Duration,
        loop_through_devices: bool,
        serial: &str,
    ) -> Result<DeviceHandle, HubError> {
        let timeout_ms = u32::try_from(timeout.as_millis())
            .unwrap_or(WAIT_FOREVER - 1)
            .clamp(1, WAIT_FOREVER - 1);
        self.wait_for_device(timeout_ms, loop_through_devices, serial)?
            .ok_or(HubError::Timeout { timeout_ms })
    }

    /// Whether `device` is still present in the current registry.
    ///
    /// Matches by fingerprint; does not re-enumerate.
    pub fn is_connected(&self, device: &dyn Device) -> bool {
        self.shared.lock().snapshot.contains(device.fingerprint())
    }

    /// Descriptors present as of the last refresh.
    pub fn devices(&self) -> Vec<Arc<DeviceDescriptor>> {
        self.shared.lock().snapshot.to_vec()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.lock().snapshot.clone()
    }

    /// Re-enumerate now and wake all waiters.
    pub fn refresh(&self) -> Result<(), HubError> {
        if self.is_shut_down() {
            return Err(HubError::Shutdown);
        }
        self.shared.refresh()
    }

    pub fn vendor_filter(&self) -> VendorFilter {
        self.shared.filter
    }

    pub fn notifications_enabled(&self) -> bool {
        self.register_notifications
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shutdown
    }

    /// Fail pending and future waits, unsubscribe, and stop the backend's
    /// notification delivery. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut registry = self.shared.lock();
            if registry.shutdown {
                return;
            }
            registry.shutdown = true;
            self.shared.changed.notify_all();
        }

        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = subscription {
            self.shared.backend.unsubscribe(id);
        }
        self.shared.backend.stop();
        info!("device hub shut down");
    }

    /// Sleep until the registry changes, the slice elapses, or the deadline passes.
    ///
    /// Without notifications, a slice that ends with no intervening refresh
    /// triggers one from this thread.
    fn block<'a>(
        &'a self,
        registry: MutexGuard<'a, Registry>,
        seen: u64,
        deadline: Option<Instant>,
        timeout_ms: u32,
        max_slice: Duration,
    ) -> Result<MutexGuard<'a, Registry>, HubError> {
        let remaining = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) if !left.is_zero() => left,
                _ => return Err(HubError::Timeout { timeout_ms }),
            },
            None => MAX_SLICE,
        };
        let mut slice = remaining.min(max_slice);
        if !self.register_notifications {
            slice = slice.min(self.poll_interval);
        }

        let (registry, _) = self
            .shared
            .changed
            .wait_timeout(registry, slice)
            .unwrap_or_else(PoisonError::into_inner);

        if self.register_notifications || registry.generation != seen || registry.shutdown {
            return Ok(registry);
        }
        drop(registry);
        self.shared.refresh()?;
        Ok(self.shared.lock())
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
