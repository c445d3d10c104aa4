//! The device control adapter.
//!
//! Translates abstract indicator intents into per-device calls across the
//! attached set. Each group operation locks a device on demand, writes
//! only when the device's cached indicator differs from the requested
//! value, and releases the lock once the desired state is idle again. A
//! device failing mid-operation is logged and dropped; nothing propagates
//! to call-control callers.
//!
//! These operations are only ever invoked from the work-queue consumer
//! path, which is what serializes them; the registry mutex additionally
//! excludes concurrent enumeration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::device::{Indicators, TelephonyDevice};
use crate::error::HidResult;
use crate::registry::DeviceRegistry;

/// The indicator state every attached device should show, plus the caller
/// id that accompanies an active ringer.
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    pub indicators: Indicators,
    pub caller_id: Option<String>,
}

/// Idempotent group operations over all attached devices.
pub struct DeviceControlAdapter {
    registry: Arc<DeviceRegistry>,
    desired: Mutex<DesiredState>,
    /// Software-side mute flag, mirrored from the endpoint and read by the
    /// mute button path to pick mute vs unmute.
    call_muted: AtomicBool,
}

impl DeviceControlAdapter {
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            desired: Mutex::new(DesiredState::default()),
            call_muted: AtomicBool::new(false),
        })
    }

    /// Whether the current call is muted, as last mirrored from the
    /// software endpoint.
    #[must_use]
    pub fn is_call_muted(&self) -> bool {
        self.call_muted.load(Ordering::Acquire)
    }

    /// Snapshot of the desired indicator state, used when synchronizing a
    /// hot-plugged device.
    #[must_use]
    pub fn desired(&self) -> DesiredState {
        self.desired.lock().clone()
    }

    pub fn set_hook_state(&self, off_hook: bool) {
        info!(off_hook, "SetHookState");
        let want = self.update_desired(|d| d.indicators.off_hook = off_hook);
        self.apply_all(
            &want,
            |device| device.is_off_hook() != off_hook,
            |device| device.set_hook_state(off_hook),
        );
    }

    pub fn set_microphone_muted(&self, muted: bool) {
        info!(muted, "SetMicrophoneMuted");
        self.call_muted.store(muted, Ordering::Release);
        let want = self.update_desired(|d| d.indicators.microphone_muted = muted);
        self.apply_all(
            &want,
            |device| device.is_microphone_muted() != muted,
            |device| device.set_microphone_muted(muted),
        );
    }

    pub fn set_ringer(&self, ringing: bool, caller_id: Option<&str>) {
        info!(ringing, caller_id = ?caller_id, "SetRinger");
        let want = self.update_desired(|d| {
            d.indicators.ringing = ringing;
            d.caller_id = if ringing { caller_id.map(String::from) } else { None };
        });
        let caller_id = want.caller_id.clone();
        self.apply_all(
            &want,
            |device| device.is_ringing() != ringing,
            move |device| device.set_ringer(ringing, caller_id.as_deref()),
        );
    }

    pub fn set_call_on_hold(&self, on_hold: bool) {
        info!(on_hold, "SetCallOnHold");
        let want = self.update_desired(|d| d.indicators.on_hold = on_hold);
        self.apply_all(
            &want,
            |device| device.is_on_hold() != on_hold,
            |device| device.set_call_on_hold(on_hold),
        );
    }

    /// Bring a freshly attached device up to the desired indicator state.
    /// Runs under the registry lock, so failures are logged here and the
    /// next group operation drops the device if it stays unreachable.
    pub fn sync_device(&self, device: &dyn TelephonyDevice, want: &DesiredState) {
        let target = want.indicators;
        let differs = |device: &dyn TelephonyDevice| {
            device.is_off_hook() != target.off_hook
                || device.is_ringing() != target.ringing
                || device.is_on_hold() != target.on_hold
                || device.is_microphone_muted() != target.microphone_muted
        };
        if let Err(e) = Self::apply_one(device, want, differs(device), |device| {
            if device.is_off_hook() != target.off_hook {
                device.set_hook_state(target.off_hook)?;
            }
            if device.is_ringing() != target.ringing {
                device.set_ringer(target.ringing, want.caller_id.as_deref())?;
            }
            if device.is_on_hold() != target.on_hold {
                device.set_call_on_hold(target.on_hold)?;
            }
            if device.is_microphone_muted() != target.microphone_muted {
                device.set_microphone_muted(target.microphone_muted)?;
            }
            Ok(())
        }) {
            warn!(device = device.id(), error = %e, "Failed to synchronize new device");
        }
    }

    fn update_desired(&self, f: impl FnOnce(&mut DesiredState)) -> DesiredState {
        let mut desired = self.desired.lock();
        f(&mut desired);
        desired.clone()
    }

    fn apply_all(
        &self,
        want: &DesiredState,
        needs_write: impl Fn(&dyn TelephonyDevice) -> bool,
        op: impl Fn(&dyn TelephonyDevice) -> HidResult<()>,
    ) {
        let mut failed = Vec::new();
        self.registry.with_devices(|devices| {
            for device in devices {
                let needed = needs_write(device.as_ref());
                if let Err(e) = Self::apply_one(device.as_ref(), want, needed, &op) {
                    warn!(device = device.id(), error = %e, "Device unreachable, dropping");
                    failed.push(device.id().to_string());
                }
            }
        });
        for id in failed {
            self.registry.remove(&id);
        }
    }

    /// A device already showing the requested value is skipped before the
    /// lock is touched; a redundant operation must leave no hardware
    /// trace at all, not even a lock/unlock pair.
    fn apply_one(
        device: &dyn TelephonyDevice,
        want: &DesiredState,
        needs_write: bool,
        op: impl FnOnce(&dyn TelephonyDevice) -> HidResult<()>,
    ) -> HidResult<()> {
        if needs_write {
            if !device.is_locked() {
                device.lock()?;
            }
            op(device)?;
        }
        if want.indicators.is_idle() && device.is_locked() {
            device.unlock()?;
        }
        Ok(())
    }
}
