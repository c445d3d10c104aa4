//! The device capability surface.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::HidResult;

/// Hardware buttons a call-control headset can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonId {
    /// Off-hook / on-hook switch, reported as a level.
    HookSwitch,
    /// Microphone mute toggle, reported as a press.
    MicMute,
    /// Hold/retrieve flash, reported as a press.
    Flash,
    /// Reject incoming call, reported as a press.
    RejectCall,
}

/// One button event: which button, on which device, and an optional value
/// (the hook switch reports its level; momentary buttons report no value,
/// except reject which reports the press itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonInput {
    pub device: String,
    pub button: ButtonId,
    pub value: Option<bool>,
}

/// Callback receiving button intents; invoked on the device pump thread.
pub type ButtonHandler = Arc<dyn Fn(ButtonInput) + Send + Sync>;

/// Events emitted by the device watcher.
#[derive(Clone)]
pub enum DeviceEvent {
    /// A device appeared (at startup or hot-plug).
    Attached(Arc<dyn TelephonyDevice>),
    /// A device went away.
    Detached { id: String },
    /// A button was operated on an attached device.
    Button(ButtonInput),
}

impl fmt::Debug for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attached(device) => f.debug_tuple("Attached").field(&device.id()).finish(),
            Self::Detached { id } => f.debug_struct("Detached").field("id", id).finish(),
            Self::Button(input) => f.debug_tuple("Button").field(input).finish(),
        }
    }
}

/// The four headset indicators, also used as the adapter's desired-state
/// record for synchronizing hot-plugged devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicators {
    pub off_hook: bool,
    pub ringing: bool,
    pub on_hold: bool,
    pub microphone_muted: bool,
}

impl Indicators {
    /// Idle means the call-control lock can be released: on-hook, not
    /// ringing, nothing held.
    #[must_use]
    pub fn is_idle(self) -> bool {
        !self.off_hook && !self.ringing && !self.on_hold
    }
}

/// Capability interface over one physical call-control headset.
///
/// Indicator-mutating operations require the device lock (host-acquired
/// call control); the adapter acquires it on demand and releases it only
/// when the device returns to idle. The `is_*` reads return the device's
/// cached indicator state, which the adapter uses to skip redundant
/// hardware writes.
pub trait TelephonyDevice: Send + Sync {
    /// Stable identity for the attached lifetime (serial number).
    fn id(&self) -> &str;

    fn is_locked(&self) -> bool;

    /// Acquire call control.
    ///
    /// # Errors
    /// Returns an error when the device is unreachable.
    fn lock(&self) -> HidResult<()>;

    /// Release call control.
    ///
    /// # Errors
    /// Returns an error when the device is unreachable.
    fn unlock(&self) -> HidResult<()>;

    fn is_off_hook(&self) -> bool;

    /// # Errors
    /// Returns an error when the device is unreachable.
    fn set_hook_state(&self, off_hook: bool) -> HidResult<()>;

    fn is_ringing(&self) -> bool;

    /// # Errors
    /// Returns an error when the device is unreachable.
    fn set_ringer(&self, ringing: bool, caller_id: Option<&str>) -> HidResult<()>;

    fn is_on_hold(&self) -> bool;

    /// # Errors
    /// Returns an error when the device is unreachable.
    fn set_call_on_hold(&self, on_hold: bool) -> HidResult<()>;

    fn is_microphone_muted(&self) -> bool;

    /// # Errors
    /// Returns an error when the device is unreachable.
    fn set_microphone_muted(&self, muted: bool) -> HidResult<()>;
}
