//! Domain primitive types used across the lxcdrv workspace.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network attachment of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Default gateway inside the container.
    pub gateway: String,
    /// Address assigned to the container interface.
    pub ip_address: String,
    /// Prefix length of `ip_address`.
    pub ip_prefix_len: u8,
    /// Interface MTU.
    pub mtu: u32,
    /// Host bridge the veth pair is linked to.
    pub bridge: String,
}

impl NetworkConfig {
    /// Returns the address in CIDR notation, e.g. `172.17.0.2/16`.
    #[must_use]
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.ip_address, self.ip_prefix_len)
    }
}

/// A bind mount from the host into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Host path.
    pub source: PathBuf,
    /// Path inside the container, relative to its root.
    pub destination: PathBuf,
    /// Whether the mount is writable.
    pub writable: bool,
}

/// Resource limits for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU shares (relative weight).
    pub cpu_shares: Option<u64>,
    /// Memory limit in bytes.
    pub memory_bytes: Option<u64>,
    /// Memory plus swap limit in bytes.
    pub memory_swap_bytes: Option<u64>,
}

/// Everything the driver needs to launch one container.
///
/// Never modified once a launch begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container identity, also the LXC container name.
    pub id: ContainerId,
    /// Root filesystem of the container.
    pub rootfs: PathBuf,
    /// Hostname set inside the container. Defaults to the ID when empty.
    pub hostname: String,
    /// In-container init stage executable.
    pub init_path: PathBuf,
    /// Command run by the init stage.
    pub entrypoint: String,
    /// Arguments passed to the entrypoint.
    pub arguments: Vec<String>,
    /// Working directory, empty for the image default.
    pub working_dir: String,
    /// Effective user, empty for the image default.
    pub user: String,
    /// Whether the container runs privileged.
    pub privileged: bool,
    /// Whether a terminal is allocated.
    pub tty: bool,
    /// Network attachment. `None` means no network.
    pub network: Option<NetworkConfig>,
    /// Extra bind mounts.
    pub mounts: Vec<MountSpec>,
    /// Cgroup resource limits.
    pub resources: ResourceLimits,
    /// Environment passed to the launcher. Empty inherits the driver's own.
    pub env: Vec<(String, String)>,
}

impl ContainerSpec {
    /// Creates a spec with the required fields and no optional settings.
    #[must_use]
    pub fn new(
        id: ContainerId,
        rootfs: impl Into<PathBuf>,
        init_path: impl Into<PathBuf>,
        entrypoint: impl Into<String>,
    ) -> Self {
        Self {
            id,
            rootfs: rootfs.into(),
            hostname: String::new(),
            init_path: init_path.into(),
            entrypoint: entrypoint.into(),
            arguments: Vec::new(),
            working_dir: String::new(),
            user: String::new(),
            privileged: false,
            tty: false,
            network: None,
            mounts: Vec::new(),
            resources: ResourceLimits::default(),
            env: Vec::new(),
        }
    }

    /// Returns the hostname to configure, falling back to the ID.
    #[must_use]
    pub fn effective_hostname(&self) -> &str {
        if self.hostname.is_empty() {
            self.id.as_str()
        } else {
            &self.hostname
        }
    }

    /// Checks the fields every launch depends on.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID or entrypoint is empty, or the ID contains
    /// a path separator.
    pub fn validate(&self) -> crate::error::Result<()> {
        let id = self.id.as_str();
        if id.is_empty() {
            return Err(crate::error::DriverError::Config {
                message: "container id is empty".into(),
            });
        }
        if id.contains('/') || id == "." || id == ".." {
            return Err(crate::error::DriverError::Config {
                message: format!("container id {id:?} is not a valid directory name"),
            });
        }
        if self.entrypoint.is_empty() {
            return Err(crate::error::DriverError::Config {
                message: format!("container {id} has no entrypoint"),
            });
        }
        Ok(())
    }
}

/// Lifecycle state of a single launch.
///
/// Not persisted; the driver logs every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// The LXC configuration is being rendered.
    Configuring,
    /// The launcher process is being spawned.
    Launching,
    /// Waiting for the status query to report `RUNNING`.
    AwaitingRunningConfirmation,
    /// The container is confirmed running.
    Running,
    /// The launcher process has exited.
    Exited,
    /// Start confirmation never arrived.
    TimedOut,
}

impl LifecycleState {
    /// Returns whether moving from `self` to `next` is a valid transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Configuring, Self::Launching)
                | (Self::Launching, Self::AwaitingRunningConfirmation)
                | (Self::AwaitingRunningConfirmation, Self::Running | Self::Exited | Self::TimedOut)
                | (Self::Running, Self::Exited)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuring => write!(f, "configuring"),
            Self::Launching => write!(f, "launching"),
            Self::AwaitingRunningConfirmation => write!(f, "awaiting-running"),
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
            Self::TimedOut => write!(f, "timed-out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ContainerSpec {
        ContainerSpec::new(ContainerId::new("c1"), "/rootfs", "/.dockerinit", "/bin/true")
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ContainerId::generate(), ContainerId::generate());
    }

    #[test]
    fn cidr_joins_address_and_prefix() {
        let net = NetworkConfig {
            gateway: "172.17.42.1".into(),
            ip_address: "172.17.0.2".into(),
            ip_prefix_len: 16,
            mtu: 1500,
            bridge: "lxcbr0".into(),
        };
        assert_eq!(net.cidr(), "172.17.0.2/16");
    }

    #[test]
    fn hostname_falls_back_to_id() {
        let mut s = spec();
        assert_eq!(s.effective_hostname(), "c1");
        s.hostname = "web".into();
        assert_eq!(s.effective_hostname(), "web");
    }

    #[test]
    fn validate_rejects_empty_id_and_entrypoint() {
        let mut s = spec();
        assert!(s.validate().is_ok());
        s.entrypoint.clear();
        assert!(s.validate().is_err());

        let mut s = spec();
        s.id = ContainerId::new("");
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_path_like_ids() {
        let mut s = spec();
        s.id = ContainerId::new("../etc");
        assert!(s.validate().is_err());
        s.id = ContainerId::new("..");
        assert!(s.validate().is_err());
    }

    #[test]
    fn early_exit_is_a_valid_shortcut() {
        use LifecycleState::*;
        assert!(AwaitingRunningConfirmation.can_transition_to(Exited));
        assert!(AwaitingRunningConfirmation.can_transition_to(TimedOut));
        assert!(Running.can_transition_to(Exited));
        assert!(!Configuring.can_transition_to(Running));
        assert!(!TimedOut.can_transition_to(Running));
        assert!(!Exited.can_transition_to(Running));
    }

    #[test]
    fn exited_and_timed_out_have_no_successors() {
        use LifecycleState::*;
        let all = [Configuring, Launching, AwaitingRunningConfirmation, Running, Exited, TimedOut];
        for terminal in [Exited, TimedOut] {
            assert!(all.iter().all(|next| !terminal.can_transition_to(*next)));
        }
    }
}
