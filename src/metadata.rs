//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is a lightweight, cloneable description of a device suitable
//! for UI display, logging, and persistence. Backends populate what they know;
//! unknown fields remain `None`.
//!
//! # Conventions
//! - `bus` is a short, human-readable bus hint like `"usb"` or `"virtual"`.
//! - `product_string` should be a friendly, user-facing name when available.
//! - `path` is an OS/topology path (opaque string) useful for diagnostics.
//!
//! ## Persistence notes
//! - `vid`/`pid` and `serial_number` (when present) are generally stable and useful for re-identification.
//! - `path` is platform-specific and may change across ports, drivers, and reconnects; treat it as
//!   diagnostic first, identity second.

use serde::{Deserialize, Serialize};

/// Snapshot of metadata describing a single device.
///
/// All fields are optional; populate what is known on the current platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// High-level bus classification (e.g., `"usb"`, `"virtual"`).
    pub bus: Option<String>,

    /// USB Vendor ID (VID), if known.
    pub vid: Option<u16>,

    /// USB Product ID (PID), if known.
    pub pid: Option<u16>,

    /// Human-readable product name from the driver/firmware.
    pub product_string: Option<String>,

    /// Device serial number supplied by firmware/OS, if present.
    ///
    /// On USB, this usually maps to the iSerialNumber string.
    pub serial_number: Option<String>,

    /// Interface index (platform-reported).
    ///
    /// Some stacks use `-1` to mean “not applicable”; backends map that to `None`.
    pub interface_number: Option<i32>,

    /// OS/topological path to the device.
    pub path: Option<String>,
}

impl DeviceMeta {
    /// Friendly name: product string, else serial, else `"Unknown"`.
    pub fn display_name(&self) -> &str {
        self.product_string
            .as_deref()
            .or(self.serial_number.as_deref())
            .unwrap_or("Unknown")
    }
}
