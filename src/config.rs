//! Hub configuration.
//!
//! [`HubConfig`] is plain data, loadable from TOML:
//!
//! ```toml
//! vendor_id = 0x8086          # 0 = accept every vendor
//! register_notifications = true
//! poll_interval_ms = 100
//! ```
//!
//! Every field is optional; missing fields take the defaults shown above.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Vendor-id restriction applied before any selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VendorFilter {
    #[default]
    Any,
    Only(u16),
}

impl VendorFilter {
    #[inline]
    pub fn matches(self, vendor_id: u16) -> bool {
        match self {
            VendorFilter::Any => true,
            VendorFilter::Only(vid) => vid == vendor_id,
        }
    }
}

/// `0` means "no filter".
impl From<u16> for VendorFilter {
    fn from(vid: u16) -> Self {
        if vid == 0 {
            VendorFilter::Any
        } else {
            VendorFilter::Only(vid)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Only consider devices from this vendor. `0` disables filtering.
    pub vendor_id: u16,

    /// Subscribe to backend hotplug notifications.
    ///
    /// When `false`, blocked waiters re-enumerate every `poll_interval_ms`.
    pub register_notifications: bool,

    /// Re-poll interval for waiters without notifications, and retry interval
    /// after a device failed to open.
    pub poll_interval_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0,
            register_notifications: true,
            poll_interval_ms: 100,
        }
    }
}

impl HubConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    #[inline]
    pub fn vendor_filter(&self) -> VendorFilter {
        VendorFilter::from(self.vendor_id)
    }

    /// Poll interval, clamped to at least 1 ms.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
