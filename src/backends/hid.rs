//! `hidapi` backend.
//!
//! - Enumerate devices via `HidApi::refresh_devices` + `device_list`
//! - Report hotplug by re-enumerating on a watcher thread every `poll_interval`
//!   and diffing fingerprints (hidapi has no native arrival/removal callbacks)
//! - Open devices by path
//!
//! The watcher thread is started by the first `subscribe` and joined by `stop`.

use crate::backends::Backend;
use crate::config::VendorFilter;
use crate::device::{Device, DeviceDescriptor, DeviceFingerprint, DeviceHandle};
use crate::error::HubError;
use crate::event::{ChangeCallback, DeviceEvent};
use crate::eventbus::{dispatch, ListenerRegistry, SubscriptionId};
use crate::metadata::DeviceMeta;
use hidapi::{DeviceInfo, HidApi, HidDevice};
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Open HID device.
pub struct HidHandle {
    id: String,
    name: String,
    fingerprint: DeviceFingerprint,
    meta: DeviceMeta,
    raw: Mutex<HidDevice>,
}

impl HidHandle {
    /// Run `f` with exclusive access to the underlying `hidapi` handle.
    pub fn with_raw<R>(&self, f: impl FnOnce(&HidDevice) -> R) -> R {
        f(&lock(&self.raw))
    }
}

impl Device for HidHandle {
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

pub struct HidBackend {
    api: Arc<Mutex<HidApi>>,
    listeners: Arc<Mutex<ListenerRegistry>>,
    stopped: Arc<AtomicBool>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
}

impl HidBackend {
    pub fn new(poll_interval: Duration) -> Result<Self, HubError> {
        let api = HidApi::new().map_err(|e| HubError::SubsystemUnavailable {
            reason: e.to_string(),
        })?;
        Ok(Self {
            api: Arc::new(Mutex::new(api)),
            listeners: Arc::new(Mutex::new(ListenerRegistry::new())),
            stopped: Arc::new(AtomicBool::new(false)),
            watcher: Mutex::new(None),
            poll_interval,
        })
    }

    fn spawn_watcher(&self) {
        let mut slot = lock(&self.watcher);
        if slot.is_some() || self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let api = Arc::clone(&self.api);
        let listeners = Arc::clone(&self.listeners);
        let stopped = Arc::clone(&self.stopped);
        let interval = self.poll_interval;
        let mut known = present(&api).unwrap_or_default();

        let spawned = thread::Builder::new()
            .name("camhub-hid-watch".into())
            .spawn(move || {
                while !stopped.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    let current = match present(&api) {
                        Ok(current) => current,
                        Err(e) => {
                            warn!(error = %e, "hid rescan failed");
                            continue;
                        }
                    };
                    let events = diff(&known, &current);
                    known = current;
                    if events.is_empty() {
                        continue;
                    }
                    let callbacks = lock(&listeners).active();
                    debug!(events = events.len(), "hid hotplug");
                    dispatch(&callbacks, &events);
                }
            });

        match spawned {
            Ok(handle) => {
                info!(?interval, "hid watcher started");
                *slot = Some(handle);
            }
            Err(e) => warn!(error = %e, "failed to spawn hid watcher; hotplug events disabled"),
        }
    }
}

impl Backend for HidBackend {
    fn enumerate(&self, filter: VendorFilter) -> Result<Vec<Arc<DeviceDescriptor>>, HubError> {
        let mut api = lock(&self.api);
        api.refresh_devices()
            .map_err(|e| HubError::SubsystemUnavailable {
                reason: e.to_string(),
            })?;
        Ok(api
            .device_list()
            .filter(|info| filter.matches(info.vendor_id()))
            .map(|info| Arc::new(descriptor(info)))
            .collect())
    }

    fn subscribe(&self, on_change: ChangeCallback) -> SubscriptionId {
        let id = lock(&self.listeners).add_listener(on_change);
        self.spawn_watcher();
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.listeners).remove_listener(id);
    }

    fn instantiate(&self, descriptor: &DeviceDescriptor) -> Result<DeviceHandle, HubError> {
        let unavailable = |reason: String| HubError::DeviceUnavailable {
            device: descriptor.fingerprint.to_string(),
            reason,
        };
        let path = descriptor
            .path()
            .ok_or_else(|| unavailable("no device path".into()))?;
        let cpath = CString::new(path).map_err(|e| unavailable(e.to_string()))?;
        let raw = lock(&self.api)
            .open_path(&cpath)
            .map_err(|e| unavailable(e.to_string()))?;

        Ok(Arc::new(HidHandle {
            id: descriptor.fingerprint.to_string(),
            name: descriptor.meta.display_name().to_owned(),
            fingerprint: descriptor.fingerprint.clone(),
            meta: descriptor.meta.clone(),
            raw: Mutex::new(raw),
        }))
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        lock(&self.listeners).clear();
        let handle = lock(&self.watcher).take();
        if let Some(handle) = handle {
            // A callback calling stop() runs on the watcher itself; it exits on its own.
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("hid watcher panicked");
            }
        }
    }
}

impl Drop for HidBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn present(api: &Mutex<HidApi>) -> Result<Vec<DeviceFingerprint>, hidapi::HidError> {
    let mut api = lock(api);
    api.refresh_devices()?;
    Ok(api.device_list().map(fingerprint).collect())
}

/// Attach/detach events turning `before` into `after`, detaches first.
fn diff(before: &[DeviceFingerprint], after: &[DeviceFingerprint]) -> Vec<DeviceEvent> {
    let detached = before
        .iter()
        .filter(|fp| !after.contains(fp))
        .map(|fp| DeviceEvent::detached(fp.clone()));
    let attached = after
        .iter()
        .filter(|fp| !before.contains(fp))
        .map(|fp| DeviceEvent::attached(fp.clone()));
    detached.chain(attached).collect()
}

fn fingerprint(info: &DeviceInfo) -> DeviceFingerprint {
    DeviceFingerprint {
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        serial_number: info.serial_number().map(|s| s.to_owned()),
        path: Some(info.path().to_string_lossy().to_string()),
    }
}

fn descriptor(info: &DeviceInfo) -> DeviceDescriptor {
    let interface_number = {
        let n = info.interface_number();
        if n >= 0 {
            Some(n)
        } else {
            None
        }
    };
    DeviceDescriptor::new(
        fingerprint(info),
        DeviceMeta {
            bus: Some("usb".into()),
            product_string: info.product_string().map(|s| s.to_string()),
            interface_number,
            ..Default::default()
        },
    )
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
