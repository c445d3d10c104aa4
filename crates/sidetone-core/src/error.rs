//! Error types for Sidetone core.

use thiserror::Error;

/// Core error type for Sidetone operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Command chain failed: {chain}: {message}")]
    CommandFailed { chain: &'static str, message: String },

    #[error("Endpoint error: {0}")]
    Endpoint(String),

    #[error("Could not determine config directory")]
    ConfigDir,

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Sidetone core operations.
pub type Result<T> = std::result::Result<T, Error>;
