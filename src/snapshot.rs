//! Registry snapshot and device selection.
//!
//! [`Snapshot`] is an **owned**, read-only view of the devices present as of the
//! last refresh. The hub replaces it wholesale on every refresh; it is never
//! mutated in place, so a reader holding an older snapshot keeps a consistent
//! list even while hotplug events are being processed.
//!
//! # Selection
//! [`Snapshot::select`] implements the lookup behind
//! [`DeviceManager::wait_for_device`](crate::manager::DeviceManager::wait_for_device):
//! - vendor filter first: non-matching descriptors are not candidates at all;
//! - a non-empty serial picks the first descriptor with that serial, in
//!   enumeration order (duplicate serials resolve to the earliest entry);
//! - an empty serial accepts any candidate. With `loop_through_devices` the pick
//!   is `cursor % len` and the cursor moves one past it, so successive calls walk
//!   the list round-robin. Without it the pick is `cursor % len` and the cursor
//!   stays put, giving a repeatable choice.
//!
//! The cursor only moves on a successful pick, and is always reduced modulo the
//! current candidate count, so it stays meaningful across registry changes.

use crate::config::VendorFilter;
use crate::device::{DeviceDescriptor, DeviceFingerprint};
use std::sync::Arc;

/// Immutable list of present devices, in backend reporting order.
///
/// Cloning is an `Arc` bump.
#[derive(Clone, Debug)]
pub struct Snapshot(Arc<[Arc<DeviceDescriptor>]>);

impl Snapshot {
    pub fn new(devices: Vec<Arc<DeviceDescriptor>>) -> Self {
        Self(devices.into())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DeviceDescriptor>> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Arc<DeviceDescriptor>> {
        self.0.to_vec()
    }

    /// Whether a device with this identity is present.
    pub fn contains(&self, fingerprint: &DeviceFingerprint) -> bool {
        self.0.iter().any(|d| d.fingerprint == *fingerprint)
    }

    /// Pick one descriptor according to the selection rules above.
    ///
    /// `cursor` is only written when a descriptor is returned.
    pub fn select(
        &self,
        filter: VendorFilter,
        serial: &str,
        loop_through_devices: bool,
        cursor: &mut usize,
    ) -> Option<Arc<DeviceDescriptor>> {
        let mut candidates = self.0.iter().filter(|d| filter.matches(d.vendor_id()));

        if !serial.is_empty() {
            return candidates.find(|d| d.serial() == serial).cloned();
        }

        let candidates: Vec<&Arc<DeviceDescriptor>> = candidates.collect();
        if candidates.is_empty() {
            return None;
        }

        let index = *cursor % candidates.len();
        if loop_through_devices {
            *cursor = (index + 1) % candidates.len();
        }
        Some(candidates[index].clone())
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FromIterator<Arc<DeviceDescriptor>> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Arc<DeviceDescriptor>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
