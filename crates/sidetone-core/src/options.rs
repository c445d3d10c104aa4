//! Module options.
//!
//! Options come from a TOML file under the user config directory, with
//! serde defaults for every field so a missing file or a partial file is
//! fine. The loaded snapshot sits in an `ArcSwap` so callback threads read
//! a consistent view and the host can swap in a reload at any time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Sidetone options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Options {
    #[serde(default)]
    pub module: ModuleOptions,
    #[serde(default)]
    pub endpoint: EndpointOptions,
    #[serde(default)]
    pub device: DeviceOptions,
}

/// Module-level gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOptions {
    /// The can-use privilege: when false the module stays inert.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Software endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointOptions {
    /// Whether a software SIP endpoint is in use. When false the mute
    /// bridge stays inert: the agent may be on a third-party phone the
    /// engine cannot mute.
    #[serde(default = "default_true")]
    pub software_endpoint: bool,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self { software_endpoint: true }
    }
}

/// Device watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceOptions {
    /// USB vendor id to match, lowercase hex without prefix.
    #[serde(default = "default_vendor_id")]
    pub vendor_id: String,
    /// Hot-plug enumeration interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self { vendor_id: default_vendor_id(), poll_interval_ms: default_poll_interval_ms() }
    }
}

fn default_true() -> bool {
    true
}

fn default_vendor_id() -> String {
    // Jabra
    "0b0e".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Options {
    /// Load options from the default config path, falling back to
    /// defaults when the file does not exist.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed,
    /// or when the config directory cannot be determined.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load options from an explicit path.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            info!(?path, "Options file not found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Get the options file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "sidetone", "Sidetone").ok_or(Error::ConfigDir)?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Shared, swappable options snapshot.
pub struct OptionsHandle {
    inner: ArcSwap<Options>,
}

impl OptionsHandle {
    #[must_use]
    pub fn new(options: Options) -> Arc<Self> {
        Arc::new(Self { inner: ArcSwap::from_pointee(options) })
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Options> {
        self.inner.load_full()
    }

    /// Swap in a new snapshot (e.g. after a reload).
    pub fn replace(&self, options: Options) {
        self.inner.store(Arc::new(options));
    }

    /// The can-use privilege gate.
    #[must_use]
    pub fn can_use(&self) -> bool {
        self.inner.load().module.enabled
    }

    /// Whether a software SIP endpoint is in use.
    #[must_use]
    pub fn use_software_endpoint(&self) -> bool {
        self.inner.load().endpoint.software_endpoint
    }
}
