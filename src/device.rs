//! Device identity, enumeration records and live handles.
//!
//! Three layers describe one physical device:
//! - [`DeviceFingerprint`]: the stable identity (vid/pid/serial/path). Two records
//!   with equal fingerprints refer to the same attachment of the same device.
//! - [`DeviceDescriptor`]: what a backend reports during enumeration. Immutable,
//!   shared as `Arc<DeviceDescriptor>` between registry snapshots.
//! - [`Device`]: a live handle produced by [`Backend::instantiate`](crate::backends::Backend::instantiate).
//!
//! ## Identity vs. object identity
//! `is_connected` checks are done by fingerprint equality, never by pointer
//! identity of the handle. A handle obtained before a disconnect/reconnect
//! cycle matches again only if the backend reports the same path.

use crate::metadata::DeviceMeta;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a device attachment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceFingerprint {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    /// Opaque enumeration locator (OS path, bus address, ...).
    pub path: Option<String>,
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)?;
        if let Some(serial) = &self.serial_number {
            write!(f, ":{serial}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "@{path}")?;
        }
        Ok(())
    }
}

/// Immutable enumeration record for one present device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub fingerprint: DeviceFingerprint,
    pub meta: DeviceMeta,
}

impl DeviceDescriptor {
    /// Build a descriptor, deriving the metadata's identity fields from `fingerprint`.
    pub fn new(fingerprint: DeviceFingerprint, meta: DeviceMeta) -> Self {
        let meta = DeviceMeta {
            vid: Some(fingerprint.vendor_id),
            pid: Some(fingerprint.product_id),
            serial_number: fingerprint.serial_number.clone(),
            path: fingerprint.path.clone(),
            ..meta
        };
        Self { fingerprint, meta }
    }

    #[inline]
    pub fn vendor_id(&self) -> u16 {
        self.fingerprint.vendor_id
    }

    /// Serial number, or `""` when the device does not report one.
    #[inline]
    pub fn serial(&self) -> &str {
        self.fingerprint.serial_number.as_deref().unwrap_or("")
    }

    #[inline]
    pub fn path(&self) -> Option<&str> {
        self.fingerprint.path.as_deref()
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.meta.display_name(), self.fingerprint)
    }
}

/// A live, instantiated device.
///
/// Handles are shared (`Arc<dyn Device>`) and may be queried from any thread.
pub trait Device: Send + Sync {
    fn name(&self) -> &str;
    /// Stable string ID derived from the fingerprint.
    fn id(&self) -> &str;
    fn fingerprint(&self) -> &DeviceFingerprint;
    fn metadata(&self) -> DeviceMeta;
}

impl fmt::Debug for dyn Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name())
            .field("id", &self.id())
            .finish()
    }
}

/// Shared handle returned to callers.
pub type DeviceHandle = Arc<dyn Device>;
