//! Hotplug events.
//!
//! Backends report presence changes as small deltas ([`ChangeKind`]) wrapped in
//! a timestamped [`DeviceEvent`]. The coordinator does not interpret the delta
//! beyond logging it: every event triggers a full re-enumeration, so a lost or
//! coalesced event can never leave the registry inconsistent.

use crate::device::DeviceFingerprint;
use std::sync::Arc;
use std::time::Instant;

/// Direction of a presence change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Attached,
    Detached,
}

/// Timestamped hotplug notification.
#[derive(Clone, Debug)]
pub struct DeviceEvent {
    /// Capture time (monotonic).
    pub at: Instant,
    pub kind: ChangeKind,
    pub fingerprint: DeviceFingerprint,
}

impl DeviceEvent {
    pub fn attached(fingerprint: DeviceFingerprint) -> Self {
        Self {
            at: Instant::now(),
            kind: ChangeKind::Attached,
            fingerprint,
        }
    }

    pub fn detached(fingerprint: DeviceFingerprint) -> Self {
        Self {
            at: Instant::now(),
            kind: ChangeKind::Detached,
            fingerprint,
        }
    }
}

/// Callback invoked by a backend for every hotplug event.
///
/// Called from the backend's notification thread (or the thread that caused the
/// change, for in-memory backends).
pub type ChangeCallback = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;
