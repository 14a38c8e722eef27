//! camhub: hotplug-aware device hub.
//!
//! Tracks the set of connected devices (cameras) reported by an enumeration
//! [`Backend`](backends::Backend) and lets any number of threads either grab a
//! matching device right now or block until one is plugged in.
//!
//! ```no_run
//! use camhub::backends::virtual_input::{virtual_camera, VirtualBackend};
//! use camhub::DeviceManager;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(VirtualBackend::new());
//! let hub = DeviceManager::new(backend.clone(), 0, true)?;
//!
//! backend.attach(virtual_camera(0x8086, 0x0b07, "ABC123"));
//! let cam = hub.wait_for_device(1000, true, "ABC123")?.expect("blocking wait returns a device");
//! assert!(hub.is_connected(cam.as_ref()));
//! # Ok::<(), camhub::HubError>(())
//! ```

pub mod backends;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod manager;
pub mod metadata;
pub mod snapshot;

pub use config::*;
pub use device::*;
pub use error::*;
pub use event::*;
pub use manager::*;
pub use snapshot::Snapshot;
