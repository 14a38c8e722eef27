//! Error types.
//!
//! "Not found" is deliberately absent: a non-blocking lookup that finds nothing
//! returns `Ok(None)`. Errors are reserved for outcomes the caller has to react
//! to differently from plain absence.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    /// A blocking wait reached its deadline without a matching device.
    #[error("no matching device within {timeout_ms} ms")]
    Timeout { timeout_ms: u32 },

    /// The device vanished between enumeration and instantiation.
    #[error("device {device} unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    /// The enumeration subsystem itself cannot be queried.
    #[error("enumeration subsystem unavailable: {reason}")]
    SubsystemUnavailable { reason: String },

    /// The hub was shut down while the call was pending.
    #[error("device hub shut down")]
    Shutdown,
}

impl HubError {
    /// Transient errors are retried inside a blocking wait.
    pub fn is_transient(&self) -> bool {
        matches!(self, HubError::DeviceUnavailable { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
