//! Sidetone HID - telephony headset device layer.
//!
//! This crate owns everything hardware-facing: the [`TelephonyDevice`]
//! capability trait, a hidapi-backed implementation for Jabra call-control
//! headsets, the hot-plug watcher, the attached-device registry, and the
//! indicator control adapter.

pub mod adapter;
pub mod device;
pub mod error;
pub mod hid;
pub mod registry;
pub mod watcher;

pub use adapter::{DesiredState, DeviceControlAdapter};
pub use device::{ButtonHandler, ButtonId, ButtonInput, DeviceEvent, Indicators, TelephonyDevice};
pub use error::{HidError, HidResult};
pub use hid::{ButtonReportDecoder, HidTelephonyDevice, JABRA_VID};
pub use registry::DeviceRegistry;
pub use watcher::DeviceWatcher;
