//! HID error types.

use thiserror::Error;

/// HID error type.
#[derive(Debug, Error)]
pub enum HidError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device unreachable: {0}")]
    Unreachable(String),

    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for HID operations.
pub type HidResult<T> = Result<T, HidError>;
