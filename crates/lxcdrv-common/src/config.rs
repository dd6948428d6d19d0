//! Driver configuration model.
//!
//! Every host path and external tool the driver touches is named here so a
//! test (or an unusual host) can point the driver somewhere else.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{DriverError, Result};

/// Root configuration for an LXC driver instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Directory holding per-container configs and the unconfined launcher link.
    pub root: PathBuf,
    /// Whether `AppArmor` is enabled on the host.
    pub apparmor: bool,
    /// External tools invoked by the driver.
    pub tools: ToolPaths,
    /// Poll intervals and bounds.
    pub timing: PollTiming,
    /// Mount table inspected for root propagation and cgroup mountpoints.
    pub mountinfo_path: PathBuf,
    /// Cgroup membership file of the driver process.
    pub proc_cgroup_path: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(constants::DEFAULT_ROOT),
            apparmor: false,
            tools: ToolPaths::default(),
            timing: PollTiming::default(),
            mountinfo_path: PathBuf::from(constants::PROC_SELF_MOUNTINFO),
            proc_cgroup_path: PathBuf::from(constants::PROC_SELF_CGROUP),
        }
    }
}

impl DriverConfig {
    /// Creates a default configuration for the given root and `AppArmor` flag.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, apparmor: bool) -> Self {
        Self {
            root: root.into(),
            apparmor,
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DriverError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Returns the directory holding a container's rendered configuration.
    #[must_use]
    pub fn container_dir(&self, id: &str) -> PathBuf {
        self.root.join(constants::CONTAINERS_DIR).join(id)
    }

    /// Returns the rendered configuration path for a container.
    #[must_use]
    pub fn config_path(&self, id: &str) -> PathBuf {
        self.container_dir(id).join(constants::CONFIG_FILE_NAME)
    }

    /// Returns the path of the unconfined launcher symlink.
    #[must_use]
    pub fn unconfined_launcher(&self) -> PathBuf {
        self.root.join(constants::UNCONFINED_LAUNCHER)
    }
}

/// Names or absolute paths of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// Container launcher.
    pub lxc_start: String,
    /// Status query.
    pub lxc_info: String,
    /// Primary signal tool.
    pub lxc_kill: String,
    /// Fallback signal tool.
    pub lxc_stop: String,
    /// Version query.
    pub lxc_version: String,
    /// Mount namespace wrapper.
    pub unshare: String,
    /// Shell used inside the wrapper.
    pub shell: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            lxc_start: constants::LXC_START.into(),
            lxc_info: constants::LXC_INFO.into(),
            lxc_kill: constants::LXC_KILL.into(),
            lxc_stop: constants::LXC_STOP.into(),
            lxc_version: constants::LXC_VERSION.into(),
            unshare: constants::UNSHARE.into(),
            shell: constants::SHELL.into(),
        }
    }
}

/// Poll timing, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollTiming {
    /// Interval between status queries during start confirmation.
    pub start_interval_ms: u64,
    /// Total bound on start confirmation.
    pub start_timeout_ms: u64,
    /// Interval between status queries during restore.
    pub restore_interval_ms: u64,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            start_interval_ms: constants::START_POLL_INTERVAL_MS,
            start_timeout_ms: constants::START_TIMEOUT_MS,
            restore_interval_ms: constants::RESTORE_POLL_INTERVAL_MS,
        }
    }
}

impl PollTiming {
    /// Interval between start confirmation queries.
    #[must_use]
    pub const fn start_interval(&self) -> Duration {
        Duration::from_millis(self.start_interval_ms)
    }

    /// Bound on start confirmation.
    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Interval between restore queries.
    #[must_use]
    pub const fn restore_interval(&self) -> Duration {
        Duration::from_millis(self.restore_interval_ms)
    }
}
