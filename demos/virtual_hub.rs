//! Block on a camera that is plugged in a moment later.
//!
//! Run with: `cargo run --example virtual_hub`

use camhub::backends::virtual_input::{virtual_camera, VirtualBackend};
use camhub::{DeviceManager, HubError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<(), HubError> {
    let backend = Arc::new(VirtualBackend::new());
    let hub = DeviceManager::new(backend.clone(), 0, true)?;

    thread::scope(|s| {
        let waiter = s.spawn(|| {
            let start = Instant::now();
            let result = hub.wait_for_device(2_000, true, "ABC123");
            (result, start.elapsed())
        });

        thread::sleep(Duration::from_millis(250));
        println!("plugging in ABC123");
        backend.attach(virtual_camera(0x8086, 0x0b07, "ABC123"));

        match waiter.join() {
            Ok((Ok(Some(cam)), elapsed)) => {
                println!("got {} ({}) after {elapsed:?}", cam.name(), cam.id());
                println!("connected: {}", hub.is_connected(cam.as_ref()));
                backend.detach("ABC123");
                hub.refresh()?;
                println!("connected after unplug: {}", hub.is_connected(cam.as_ref()));
            }
            Ok((Ok(None), _)) => println!("no device"),
            Ok((Err(e), _)) => println!("wait failed: {e}"),
            Err(_) => println!("waiter panicked"),
        }
        Ok::<(), HubError>(())
    })?;

    backend.attach(virtual_camera(0x8086, 0x0b07, "ABC123"));
    backend.attach(virtual_camera(0x8086, 0x0b07, "DEF456"));
    for _ in 0..3 {
        if let Some(cam) = hub.try_device(true, "")? {
            println!("round robin: {} ({})", cam.name(), cam.id());
        }
    }
    Ok(())
}
