//! In-memory backend.
//!
//! [`VirtualBackend`] holds its device list in memory and reports changes made
//! through [`attach`](VirtualBackend::attach) / [`detach`](VirtualBackend::detach)
//! synchronously, on the calling thread. It can also simulate the two failure
//! modes a real subsystem has: a device that refuses to open, and an
//! enumeration call that fails outright.

use crate::backends::Backend;
use crate::config::VendorFilter;
use crate::device::{Device, DeviceDescriptor, DeviceFingerprint, DeviceHandle};
use crate::error::HubError;
use crate::event::{ChangeCallback, DeviceEvent};
use crate::eventbus::{dispatch, ListenerRegistry, SubscriptionId};
use crate::metadata::DeviceMeta;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Live handle produced by [`VirtualBackend::instantiate`].
#[derive(Debug)]
pub struct VirtualDevice {
    id: String,
    name: String,
    fingerprint: DeviceFingerprint,
    meta: DeviceMeta,
}

impl VirtualDevice {
    pub fn new(descriptor: &DeviceDescriptor) -> Self {
        Self {
            id: descriptor.fingerprint.to_string(),
            name: descriptor.meta.display_name().to_owned(),
            fingerprint: descriptor.fingerprint.clone(),
            meta: descriptor.meta.clone(),
        }
    }
}

impl Device for VirtualDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn fingerprint(&self) -> &DeviceFingerprint {
        &self.fingerprint
    }

    fn metadata(&self) -> DeviceMeta {
        self.meta.clone()
    }
}

/// Build a virtual camera descriptor. `path` defaults to `virtual:<serial>`.
pub fn virtual_camera(vendor_id: u16, product_id: u16, serial: &str) -> DeviceDescriptor {
    let path = format!("virtual:{serial}");
    DeviceDescriptor::new(
        DeviceFingerprint {
            vendor_id,
            product_id,
            serial_number: Some(serial.to_owned()),
            path: Some(path),
        },
        DeviceMeta {
            bus: Some("virtual".into()),
            product_string: Some(format!("Virtual Camera {serial}")),
            ..Default::default()
        },
    )
}

#[derive(Default)]
pub struct VirtualBackend {
    devices: Mutex<Vec<Arc<DeviceDescriptor>>>,
    unavailable: Mutex<HashSet<DeviceFingerprint>>,
    listeners: Mutex<ListenerRegistry>,
    enumeration_fails: AtomicBool,
    stopped: AtomicBool,
    enumerations: AtomicUsize,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `devices`, without firing events.
    pub fn with_devices(devices: impl IntoIterator<Item = DeviceDescriptor>) -> Self {
        let backend = Self::new();
        lock(&backend.devices).extend(devices.into_iter().map(Arc::new));
        backend
    }

    /// Add a device at the end of the list and report it.
    pub fn attach(&self, descriptor: DeviceDescriptor) {
        let event = DeviceEvent::attached(descriptor.fingerprint.clone());
        lock(&self.devices).push(Arc::new(descriptor));
        self.emit(event);
    }

    /// Remove every device with this serial and report each removal.
    ///
    /// Returns the number of devices removed.
    pub fn detach(&self, serial: &str) -> usize {
        let removed: Vec<Arc<DeviceDescriptor>> = {
            let mut devices = lock(&self.devices);
            let (gone, kept): (Vec<_>, Vec<_>) =
                devices.drain(..).partition(|d| d.serial() == serial);
            *devices = kept;
            gone
        };
        for descriptor in &removed {
            self.emit(DeviceEvent::detached(descriptor.fingerprint.clone()));
        }
        removed.len()
    }

    /// Make `instantiate` fail for this device (it stays enumerated).
    pub fn set_unavailable(&self, fingerprint: &DeviceFingerprint, unavailable: bool) {
        let mut set = lock(&self.unavailable);
        if unavailable {
            set.insert(fingerprint.clone());
        } else {
            set.remove(fingerprint);
        }
    }

    /// Make `enumerate` fail with `SubsystemUnavailable`.
    pub fn set_enumeration_failure(&self, fail: bool) {
        self.enumeration_fails.store(fail, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Number of `enumerate` calls served so far.
    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    fn emit(&self, event: DeviceEvent) {
        if self.is_stopped() {
            return;
        }
        // Callbacks run without any of our locks held; they may re-enter `enumerate`.
        let callbacks = lock(&self.listeners).active();
        tracing::debug!(kind = ?event.kind, device = %event.fingerprint, listeners = callbacks.len(), "virtual hotplug");
        dispatch(&callbacks, &[event]);
    }
}

impl Backend for VirtualBackend {
    fn enumerate(&self, filter: VendorFilter) -> Result<Vec<Arc<DeviceDescriptor>>, HubError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        if self.enumeration_fails.load(Ordering::SeqCst) {
            return Err(HubError::SubsystemUnavailable {
                reason: "virtual enumeration disabled".into(),
            });
        }
        Ok(lock(&self.devices)
            .iter()
            .filter(|d| filter.matches(d.vendor_id()))
            .cloned()
            .collect())
    }

    fn subscribe(&self, on_change: ChangeCallback) -> SubscriptionId {
        lock(&self.listeners).add_listener(on_change)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.listeners).remove_listener(id);
    }

    fn instantiate(&self, descriptor: &DeviceDescriptor) -> Result<DeviceHandle, HubError> {
        let present = lock(&self.devices)
            .iter()
            .any(|d| d.fingerprint == descriptor.fingerprint);
        if !present {
            return Err(HubError::DeviceUnavailable {
                device: descriptor.fingerprint.to_string(),
                reason: "device detached".into(),
            });
        }
        if lock(&self.unavailable).contains(&descriptor.fingerprint) {
            return Err(HubError::DeviceUnavailable {
                device: descriptor.fingerprint.to_string(),
                reason: "device busy".into(),
            });
        }
        Ok(Arc::new(VirtualDevice::new(descriptor)))
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        lock(&self.listeners).clear();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
