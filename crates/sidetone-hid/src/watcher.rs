//! Hot-plug watcher.
//!
//! Runs a dedicated enumeration thread that diffs the HID device list at
//! the configured interval, emitting [`DeviceEvent::Attached`] and
//! [`DeviceEvent::Detached`]. Each attached device gets its own reader
//! thread forwarding decoded button inputs; a read failure detaches the
//! device immediately, so a still-enumerable device (transient I/O
//! fault, suspend/resume) is re-attached with a fresh reader on the next
//! enumeration pass instead of lingering with dead buttons.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use sidetone_core::OptionsHandle;

use crate::device::DeviceEvent;
use crate::hid::{BUTTON_REPORT_ID, ButtonReportDecoder, HidTelephonyDevice, JABRA_VID};

const READ_TIMEOUT_MS: i32 = 500;

/// Watches for call-control headsets coming and going.
pub struct DeviceWatcher;

impl DeviceWatcher {
    /// Spawn the watcher thread; the returned channel carries every
    /// device event until the receiver is dropped.
    #[must_use]
    pub fn spawn(options: Arc<OptionsHandle>) -> mpsc::UnboundedReceiver<DeviceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("sidetone-hotplug".to_string())
            .spawn(move || {
                let mut api = match HidApi::new() {
                    Ok(api) => api,
                    Err(e) => {
                        error!(error = %e, "Failed to initialize HID backend");
                        return;
                    }
                };

                // Shared with the reader threads: a failed reader prunes
                // its serial here so the next pass re-attaches it.
                let attached: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
                loop {
                    if tx.is_closed() {
                        debug!("Event receiver dropped, watcher exiting");
                        return;
                    }

                    let opts = options.current();
                    let vendor_id =
                        u16::from_str_radix(&opts.device.vendor_id, 16).unwrap_or(JABRA_VID);

                    if let Err(e) = api.refresh_devices() {
                        warn!(error = %e, "Device enumeration failed");
                    } else {
                        Self::diff_devices(&api, vendor_id, &attached, &tx);
                    }

                    std::thread::sleep(Duration::from_millis(opts.device.poll_interval_ms));
                }
            })
            .expect("Failed to spawn hot-plug watcher thread");

        rx
    }

    fn diff_devices(
        api: &HidApi,
        vendor_id: u16,
        attached: &Arc<Mutex<HashSet<String>>>,
        tx: &mpsc::UnboundedSender<DeviceEvent>,
    ) {
        let mut present = HashSet::new();
        for info in api.device_list().filter(|d| d.vendor_id() == vendor_id) {
            let Some(serial) = info.serial_number() else {
                continue;
            };
            let serial = serial.to_string();
            if !present.insert(serial.clone()) || attached.lock().contains(&serial) {
                continue;
            }

            // Two handles: the device object writes indicators, the
            // reader thread blocks on button reports.
            let device = match HidTelephonyDevice::open(api, info) {
                Ok(device) => Arc::new(device),
                Err(e) => {
                    debug!(serial = %serial, error = %e, "Could not open device");
                    continue;
                }
            };
            match info.open_device(api) {
                Ok(reader) => {
                    Self::spawn_reader(serial.clone(), reader, Arc::clone(attached), tx.clone());
                }
                Err(e) => {
                    warn!(serial = %serial, error = %e, "Could not open button reader");
                    continue;
                }
            }

            attached.lock().insert(serial);
            let _ = tx.send(DeviceEvent::Attached(device));
        }

        let gone: Vec<String> =
            attached.lock().difference(&present).cloned().collect();
        for id in gone {
            Self::drop_device(attached, tx, id);
        }
    }

    fn spawn_reader(
        serial: String,
        reader: HidDevice,
        attached: Arc<Mutex<HashSet<String>>>,
        tx: mpsc::UnboundedSender<DeviceEvent>,
    ) {
        std::thread::Builder::new()
            .name(format!("sidetone-buttons-{serial}"))
            .spawn(move || {
                let mut decoder = ButtonReportDecoder::new();
                let mut buf = [0u8; 8];
                loop {
                    match reader.read_timeout(&mut buf, READ_TIMEOUT_MS) {
                        Ok(0) => {}
                        Ok(n) if n >= 2 && buf[0] == BUTTON_REPORT_ID => {
                            for input in decoder.decode(&serial, buf[1]) {
                                if tx.send(DeviceEvent::Button(input)).is_err() {
                                    return;
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            debug!(serial = %serial, error = %e, "Button read failed, detaching device");
                            Self::drop_device(&attached, &tx, serial);
                            return;
                        }
                    }
                    if tx.is_closed() {
                        return;
                    }
                }
            })
            .expect("Failed to spawn button reader thread");
    }

    /// Forget a device and report it gone. Shared by the enumeration diff
    /// and the reader-failure path, so a device whose buttons died while
    /// it remained enumerable is detached and picked up fresh next pass.
    fn drop_device(
        attached: &Mutex<HashSet<String>>,
        tx: &mpsc::UnboundedSender<DeviceEvent>,
        id: String,
    ) {
        attached.lock().remove(&id);
        let _ = tx.send(DeviceEvent::Detached { id });
    }
}
