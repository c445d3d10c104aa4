//! The attached-device registry.
//!
//! One mutex guards the attached set, and all adapter iteration goes
//! through it, so device enumeration can never race an indicator write.
//! Add and remove are routed through the serialized work queue; button
//! inputs are forwarded to the dispatcher callback as opaque intents.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use sidetone_core::WorkQueue;

use crate::adapter::DeviceControlAdapter;
use crate::device::{ButtonHandler, DeviceEvent, TelephonyDevice};

/// Tracks the set of attached call-control devices.
pub struct DeviceRegistry {
    devices: Mutex<Vec<Arc<dyn TelephonyDevice>>>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self { devices: Mutex::new(Vec::new()) })
    }

    /// Run `f` over the attached set under the registry lock.
    pub fn with_devices<R>(&self, f: impl FnOnce(&[Arc<dyn TelephonyDevice>]) -> R) -> R {
        let devices = self.devices.lock();
        f(&devices)
    }

    /// Append a device and synchronize it inside the same critical
    /// section, so a hot-plugged device never surfaces in a stale state.
    pub fn add(&self, device: Arc<dyn TelephonyDevice>, sync: impl FnOnce(&dyn TelephonyDevice)) {
        let mut devices = self.devices.lock();
        if devices.iter().any(|d| d.id() == device.id()) {
            debug!(device = device.id(), "Device already attached, ignoring");
            return;
        }
        info!(device = device.id(), "Device attached");
        sync(device.as_ref());
        devices.push(device);
    }

    /// Drop a device from the attached set.
    pub fn remove(&self, id: &str) -> Option<Arc<dyn TelephonyDevice>> {
        let mut devices = self.devices.lock();
        let index = devices.iter().position(|d| d.id() == id)?;
        info!(device = id, "Device detached");
        Some(devices.swap_remove(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.lock().is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.devices.lock().iter().map(|d| d.id().to_string()).collect()
    }

    /// Consume the device event stream on a pump thread.
    ///
    /// Attach/detach mutations are enqueued on the work queue (never run
    /// on the watcher's thread); a freshly attached device is brought up
    /// to the adapter's desired indicator state within that same work
    /// item. Button inputs go straight to `on_button`, which decides what
    /// to enqueue.
    pub fn start(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<DeviceEvent>,
        queue: Arc<WorkQueue>,
        adapter: Arc<DeviceControlAdapter>,
        on_button: ButtonHandler,
    ) {
        let registry = Arc::clone(self);
        std::thread::Builder::new()
            .name("sidetone-devices".to_string())
            .spawn(move || {
                while let Some(event) = events.blocking_recv() {
                    match event {
                        DeviceEvent::Attached(device) => {
                            let registry = Arc::clone(&registry);
                            let adapter = Arc::clone(&adapter);
                            queue.enqueue(move || {
                                let want = adapter.desired();
                                registry.add(device, |d| adapter.sync_device(d, &want));
                            });
                        }
                        DeviceEvent::Detached { id } => {
                            let registry = Arc::clone(&registry);
                            queue.enqueue(move || {
                                registry.remove(&id);
                            });
                        }
                        DeviceEvent::Button(input) => {
                            debug!(device = %input.device, button = ?input.button, value = ?input.value, "Button input");
                            on_button(input);
                        }
                    }
                }
                debug!("Device event stream closed, pump exiting");
            })
            .expect("Failed to spawn device pump thread");
    }
}
