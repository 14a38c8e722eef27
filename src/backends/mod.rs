//! Enumeration backends for `camhub`.
//!
//! A [`Backend`] is the enumeration/notification subsystem the hub sits on. It
//! lists present devices, reports attach/detach events, and opens devices. The
//! hub never talks to drivers directly.
//!
//! # Feature flags
//! - **`hid`**: enables [`hid::HidBackend`] (enumeration through `hidapi`, hotplug by polling).
//!
//! [`virtual_input::VirtualBackend`] is always available; it keeps the device list
//! in memory and is what the tests drive.

use crate::config::VendorFilter;
use crate::device::{DeviceDescriptor, DeviceHandle};
use crate::error::HubError;
use crate::event::ChangeCallback;
use crate::eventbus::SubscriptionId;
use std::sync::Arc;

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;
pub mod virtual_input;

/// Enumeration and hotplug-notification subsystem.
///
/// Implementations must be callable from any thread, including from inside their
/// own change callbacks.
pub trait Backend: Send + Sync {
    /// Devices present right now, in a stable reporting order.
    ///
    /// Fails with [`HubError::SubsystemUnavailable`] when the subsystem cannot be queried.
    fn enumerate(&self, filter: VendorFilter) -> Result<Vec<Arc<DeviceDescriptor>>, HubError>;

    /// Register a callback for attach/detach events.
    fn subscribe(&self, on_change: ChangeCallback) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// Open a live handle for `descriptor`.
    ///
    /// Fails with [`HubError::DeviceUnavailable`] if the device went away after it
    /// was enumerated.
    fn instantiate(&self, descriptor: &DeviceDescriptor) -> Result<DeviceHandle, HubError>;

    /// Halt notification delivery. No callback may start after this returns.
    fn stop(&self);
}
