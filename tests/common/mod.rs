#![allow(dead_code)]

use camhub::backends::virtual_input::{virtual_camera, VirtualBackend};
use camhub::{DeviceDescriptor, DeviceManager, HubConfig};
use std::sync::Arc;

pub const INTEL: u16 = 0x8086;
pub const OTHER: u16 = 0x2bc5;

pub fn cam(serial: &str) -> DeviceDescriptor {
    virtual_camera(INTEL, 0x0b07, serial)
}

pub fn backend(serials: &[&str]) -> Arc<VirtualBackend> {
    Arc::new(VirtualBackend::with_devices(serials.iter().map(|s| cam(s))))
}

pub fn hub(backend: &Arc<VirtualBackend>) -> DeviceManager {
    DeviceManager::new(backend.clone(), 0, true).expect("virtual backend enumerates")
}

pub fn polling_hub(backend: &Arc<VirtualBackend>, poll_interval_ms: u64) -> DeviceManager {
    let config = HubConfig {
        register_notifications: false,
        poll_interval_ms,
        ..HubConfig::default()
    };
    DeviceManager::with_config(backend.clone(), &config).expect("virtual backend enumerates")
}
