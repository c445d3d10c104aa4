//! hidapi-backed Jabra call-control device.
//!
//! Jabra headsets expose call control on a vendor HID interface: the host
//! writes an LED bitmap (off-hook, mute, ring, hold) and reads a button
//! bitmap back. The report ids and bit layout here follow the telephony
//! usage bitmaps of that interface; a device with a different descriptor
//! needs a mapping table in front of this.

use std::sync::atomic::{AtomicBool, Ordering};

use hidapi::{DeviceInfo, HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::device::{ButtonId, ButtonInput, Indicators, TelephonyDevice};
use crate::error::HidResult;

/// Jabra USB vendor id.
pub const JABRA_VID: u16 = 0x0b0e;

/// Input report carrying the button bitmap.
pub const BUTTON_REPORT_ID: u8 = 0x01;
/// Output report carrying the indicator LED bitmap.
pub const LED_REPORT_ID: u8 = 0x02;

const HOOK_BIT: u8 = 0x01;
const MUTE_BIT: u8 = 0x02;
const FLASH_BIT: u8 = 0x04;
const REJECT_BIT: u8 = 0x08;

const RING_BIT: u8 = 0x04;
const HOLD_BIT: u8 = 0x08;

/// A connected Jabra call-control headset.
pub struct HidTelephonyDevice {
    serial: String,
    /// Write handle; button reads go through a second handle owned by the
    /// watcher's reader thread so writes never wait on a blocking read.
    io: Mutex<HidDevice>,
    indicators: Mutex<Indicators>,
    locked: AtomicBool,
}

impl HidTelephonyDevice {
    /// Open the device described by `info`.
    ///
    /// # Errors
    /// Returns an error when the device cannot be opened.
    pub fn open(api: &HidApi, info: &DeviceInfo) -> HidResult<Self> {
        let device = info.open_device(api)?;
        let serial = info.serial_number().unwrap_or("unknown").to_string();
        debug!(serial = %serial, product = ?info.product_string(), "Opened call-control device");

        Ok(Self {
            serial,
            io: Mutex::new(device),
            indicators: Mutex::new(Indicators::default()),
            locked: AtomicBool::new(false),
        })
    }

    fn write_leds(&self, indicators: Indicators) -> HidResult<()> {
        let mut bits = 0u8;
        if indicators.off_hook {
            bits |= HOOK_BIT;
        }
        if indicators.microphone_muted {
            bits |= MUTE_BIT;
        }
        if indicators.ringing {
            bits |= RING_BIT;
        }
        if indicators.on_hold {
            bits |= HOLD_BIT;
        }

        let report = [LED_REPORT_ID, bits];
        self.io.lock().write(&report)?;
        trace!(serial = %self.serial, bits, "Wrote indicator report");
        Ok(())
    }
}

impl TelephonyDevice for HidTelephonyDevice {
    fn id(&self) -> &str {
        &self.serial
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn lock(&self) -> HidResult<()> {
        // Call-control acquisition is host-side bookkeeping on this
        // interface; the device accepts indicator writes regardless.
        self.locked.store(true, Ordering::Release);
        Ok(())
    }

    fn unlock(&self) -> HidResult<()> {
        self.locked.store(false, Ordering::Release);
        Ok(())
    }

    fn is_off_hook(&self) -> bool {
        self.indicators.lock().off_hook
    }

    fn set_hook_state(&self, off_hook: bool) -> HidResult<()> {
        let mut indicators = self.indicators.lock();
        indicators.off_hook = off_hook;
        self.write_leds(*indicators)
    }

    fn is_ringing(&self) -> bool {
        self.indicators.lock().ringing
    }

    fn set_ringer(&self, ringing: bool, caller_id: Option<&str>) -> HidResult<()> {
        if let Some(caller_id) = caller_id {
            // Caller-id display is a separate vendor report on devices
            // that have a screen; this interface only drives the lamp.
            debug!(serial = %self.serial, caller_id, "Ringer with caller id");
        }
        let mut indicators = self.indicators.lock();
        indicators.ringing = ringing;
        self.write_leds(*indicators)
    }

    fn is_on_hold(&self) -> bool {
        self.indicators.lock().on_hold
    }

    fn set_call_on_hold(&self, on_hold: bool) -> HidResult<()> {
        let mut indicators = self.indicators.lock();
        indicators.on_hold = on_hold;
        self.write_leds(*indicators)
    }

    fn is_microphone_muted(&self) -> bool {
        self.indicators.lock().microphone_muted
    }

    fn set_microphone_muted(&self, muted: bool) -> HidResult<()> {
        let mut indicators = self.indicators.lock();
        indicators.microphone_muted = muted;
        self.write_leds(*indicators)
    }
}

/// Edge decoder for the button bitmap.
///
/// The hook switch is a level and reports both edges with its new state;
/// mute and flash are momentary and report only the press, with no value;
/// reject reports the press as `Some(true)`, matching what the dispatcher
/// gates on.
#[derive(Debug, Default)]
pub struct ButtonReportDecoder {
    last: u8,
}

impl ButtonReportDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, device: &str, bits: u8) -> Vec<ButtonInput> {
        let changed = bits ^ self.last;
        self.last = bits;

        let mut inputs = Vec::new();
        if changed & HOOK_BIT != 0 {
            inputs.push(ButtonInput {
                device: device.to_string(),
                button: ButtonId::HookSwitch,
                value: Some(bits & HOOK_BIT != 0),
            });
        }
        if changed & MUTE_BIT != 0 && bits & MUTE_BIT != 0 {
            inputs.push(ButtonInput {
                device: device.to_string(),
                button: ButtonId::MicMute,
                value: None,
            });
        }
        if changed & FLASH_BIT != 0 && bits & FLASH_BIT != 0 {
            inputs.push(ButtonInput {
                device: device.to_string(),
                button: ButtonId::Flash,
                value: None,
            });
        }
        if changed & REJECT_BIT != 0 && bits & REJECT_BIT != 0 {
            inputs.push(ButtonInput {
                device: device.to_string(),
                button: ButtonId::RejectCall,
                value: Some(true),
            });
        }
        inputs
    }
}
