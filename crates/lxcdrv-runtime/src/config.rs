//! LXC configuration synthesis.
//!
//! Renders a [`ContainerSpec`] into the `config.lxc` file passed to
//! `lxc-start -f`. The template is fixed; only the values vary.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use lxcdrv_common::config::DriverConfig;
use lxcdrv_common::error::{DriverError, Result};
use lxcdrv_common::types::ContainerSpec;
use thiserror::Error;

/// Capabilities dropped from unprivileged containers.
const DROPPED_CAPABILITIES: &str = "audit_control audit_write mac_admin mac_override mknod \
     setfcap setpcap sys_admin sys_boot sys_module sys_nice sys_pacct sys_rawio sys_resource \
     sys_time sys_tty_config";

/// Device nodes an unprivileged container may use.
const ALLOWED_DEVICES: &[(&str, &str)] = &[
    ("c *:* m", "mknod of any character device"),
    ("b *:* m", "mknod of any block device"),
    ("c 1:3 rwm", "/dev/null"),
    ("c 1:5 rwm", "/dev/zero"),
    ("c 1:7 rwm", "/dev/full"),
    ("c 1:8 rwm", "/dev/random"),
    ("c 1:9 rwm", "/dev/urandom"),
    ("c 5:0 rwm", "/dev/tty"),
    ("c 5:1 rwm", "/dev/console"),
    ("c 5:2 rwm", "/dev/ptmx"),
    ("c 4:0 rwm", "/dev/tty0"),
    ("c 4:1 rwm", "/dev/tty1"),
    ("c 136:* rwm", "/dev/pts/*"),
    ("c 10:200 rwm", "/dev/net/tun"),
];

/// A spec value the template cannot represent.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The value contains a character that breaks the line-oriented format.
    #[error("field {field} contains a newline or NUL: {value:?}")]
    Malformed {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// A field the template needs is empty.
    #[error("field {field} is required")]
    Missing {
        /// Missing field.
        field: &'static str,
    },
}

/// Renders the LXC configuration for a container.
///
/// # Errors
///
/// Returns an error if a value contains a newline or NUL, or the network is
/// configured without a bridge.
#[allow(clippy::too_many_lines)]
pub fn render(spec: &ContainerSpec, apparmor: bool) -> std::result::Result<String, TemplateError> {
    let rootfs = checked("rootfs", &spec.rootfs.to_string_lossy())?.to_string();
    if rootfs.is_empty() {
        return Err(TemplateError::Missing { field: "rootfs" });
    }
    let hostname = checked("hostname", spec.effective_hostname())?;

    let mut out = String::new();
    let _ = writeln!(out, "# container {}", spec.id);
    let _ = writeln!(out, "lxc.utsname = {hostname}");
    out.push('\n');

    match &spec.network {
        Some(net) => {
            let bridge = checked("network.bridge", &net.bridge)?;
            if bridge.is_empty() {
                return Err(TemplateError::Missing {
                    field: "network.bridge",
                });
            }
            out.push_str("lxc.network.type = veth\n");
            let _ = writeln!(out, "lxc.network.link = {bridge}");
            out.push_str("lxc.network.name = eth0\n");
            let _ = writeln!(out, "lxc.network.mtu = {}", net.mtu);
            out.push_str("lxc.network.flags = up\n");
        }
        None => {
            out.push_str("lxc.network.type = empty\n");
            out.push_str("lxc.network.flags = up\n");
        }
    }
    out.push('\n');

    let _ = writeln!(out, "lxc.rootfs = {rootfs}");
    out.push_str("lxc.pts = 1024\n");
    out.push_str("lxc.console = none\n");
    let _ = writeln!(out, "lxc.tty = {}", u8::from(spec.tty));
    out.push('\n');

    if spec.privileged {
        out.push_str("lxc.cgroup.devices.allow = a\n");
    } else {
        out.push_str("lxc.cgroup.devices.deny = a\n");
        for (rule, device) in ALLOWED_DEVICES {
            let _ = writeln!(out, "# {device}");
            let _ = writeln!(out, "lxc.cgroup.devices.allow = {rule}");
        }
    }
    out.push('\n');

    let root = fstab_escape(&rootfs);
    let _ = writeln!(out, "lxc.mount.entry = proc {root}/proc proc nosuid,nodev,noexec 0 0");
    let _ = writeln!(out, "lxc.mount.entry = sysfs {root}/sys sysfs nosuid,nodev,noexec 0 0");
    let _ = writeln!(
        out,
        "lxc.mount.entry = devpts {root}/dev/pts devpts newinstance,ptmxmode=0666,nosuid,noexec 0 0"
    );
    let _ = writeln!(
        out,
        "lxc.mount.entry = shm {root}/dev/shm tmpfs size=65536k,nosuid,nodev,noexec 0 0"
    );
    for mount in &spec.mounts {
        let source = checked("mount.source", &mount.source.to_string_lossy())?.to_string();
        let dest = checked("mount.destination", &mount.destination.to_string_lossy())?.to_string();
        let mode = if mount.writable { "rw" } else { "ro" };
        let _ = writeln!(
            out,
            "lxc.mount.entry = {} {root}/{} none bind,{mode} 0 0",
            fstab_escape(&source),
            fstab_escape(dest.trim_start_matches('/')),
        );
    }
    out.push('\n');

    if spec.privileged {
        if apparmor {
            out.push_str("lxc.aa_profile = unconfined\n");
        } else {
            out.push_str("# lxc.aa_profile = unconfined\n");
        }
    } else {
        let _ = writeln!(out, "lxc.cap.drop = {DROPPED_CAPABILITIES}");
    }

    let limits = &spec.resources;
    if let Some(bytes) = limits.memory_bytes {
        let _ = writeln!(out, "lxc.cgroup.memory.limit_in_bytes = {bytes}");
        let _ = writeln!(out, "lxc.cgroup.memory.soft_limit_in_bytes = {bytes}");
    }
    if let Some(bytes) = limits.memory_swap_bytes {
        let _ = writeln!(out, "lxc.cgroup.memory.memsw.limit_in_bytes = {bytes}");
    }
    if let Some(shares) = limits.cpu_shares {
        let _ = writeln!(out, "lxc.cgroup.cpu.shares = {shares}");
    }

    Ok(out)
}

/// Renders and writes `<root>/containers/<id>/config.lxc`, returning its path.
///
/// The file is rendered fully in memory before anything touches the disk,
/// so a render failure leaves any previous file in place.
///
/// # Errors
///
/// Returns `ConfigWrite` if rendering fails or the file cannot be written.
pub fn write_config(config: &DriverConfig, spec: &ContainerSpec) -> Result<PathBuf> {
    let path = config.config_path(spec.id.as_str());
    let rendered = render(spec, config.apparmor).map_err(|e| DriverError::ConfigWrite {
        path: path.clone(),
        message: e.to_string(),
        source: None,
    })?;

    let dir = config.container_dir(spec.id.as_str());
    std::fs::create_dir_all(&dir).map_err(|e| write_error(&path, "cannot create directory", e))?;
    std::fs::write(&path, rendered).map_err(|e| write_error(&path, "cannot write file", e))?;
    tracing::debug!(id = %spec.id, path = %path.display(), "wrote lxc config");
    Ok(path)
}

fn write_error(path: &Path, message: &str, source: std::io::Error) -> DriverError {
    DriverError::ConfigWrite {
        path: path.to_path_buf(),
        message: message.to_string(),
        source: Some(source),
    }
}

fn checked<'a>(field: &'static str, value: &'a str) -> std::result::Result<&'a str, TemplateError> {
    if value.contains(['\n', '\r', '\0']) {
        return Err(TemplateError::Malformed {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Escapes whitespace and backslashes the way fstab fields expect.
fn fstab_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ' ' => out.push_str("\\040"),
            '\t' => out.push_str("\\011"),
            '\\' => out.push_str("\\134"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use lxcdrv_common::types::{ContainerId, MountSpec, NetworkConfig, ResourceLimits};

    use super::*;

    fn spec() -> ContainerSpec {
        ContainerSpec::new(ContainerId::new("c1"), "/var/lib/rootfs/c1", "/.dockerinit", "/bin/sh")
    }

    #[test]
    fn unnetworked_container_gets_empty_network() {
        let text = render(&spec(), false).expect("render");
        assert!(text.contains("lxc.utsname = c1\n"));
        assert!(text.contains("lxc.network.type = empty\n"));
        assert!(text.contains("lxc.rootfs = /var/lib/rootfs/c1\n"));
        assert!(!text.contains("veth"));
    }

    #[test]
    fn networked_container_links_bridge() {
        let mut s = spec();
        s.network = Some(NetworkConfig {
            gateway: "172.17.42.1".into(),
            ip_address: "172.17.0.2".into(),
            ip_prefix_len: 16,
            mtu: 1400,
            bridge: "lxcbr0".into(),
        });
        let text = render(&s, false).expect("render");
        assert!(text.contains("lxc.network.type = veth\n"));
        assert!(text.contains("lxc.network.link = lxcbr0\n"));
        assert!(text.contains("lxc.network.mtu = 1400\n"));
    }

    #[test]
    fn network_without_bridge_is_rejected() {
        let mut s = spec();
        s.network = Some(NetworkConfig {
            gateway: "10.0.0.1".into(),
            ip_address: "10.0.0.2".into(),
            ip_prefix_len: 24,
            mtu: 1500,
            bridge: String::new(),
        });
        assert!(matches!(
            render(&s, false),
            Err(TemplateError::Missing { field: "network.bridge" })
        ));
    }

    #[test]
    fn unprivileged_container_is_confined() {
        let text = render(&spec(), true).expect("render");
        assert!(text.contains("lxc.cgroup.devices.deny = a\n"));
        assert!(text.contains("lxc.cgroup.devices.allow = c 1:3 rwm\n"));
        assert!(text.contains("lxc.cap.drop = "));
        assert!(!text.contains("aa_profile"));
    }

    #[test]
    fn privileged_container_under_apparmor_is_unconfined() {
        let mut s = spec();
        s.privileged = true;
        let text = render(&s, true).expect("render");
        assert!(text.contains("lxc.cgroup.devices.allow = a\n"));
        assert!(text.contains("\nlxc.aa_profile = unconfined\n"));
        assert!(!text.contains("lxc.cap.drop"));

        let text = render(&s, false).expect("render");
        assert!(text.contains("# lxc.aa_profile = unconfined\n"));
    }

    #[test]
    fn bind_mounts_and_limits_are_rendered() {
        let mut s = spec();
        s.mounts = vec![MountSpec {
            source: "/srv/my data".into(),
            destination: "/data".into(),
            writable: false,
        }];
        s.resources = ResourceLimits {
            cpu_shares: Some(512),
            memory_bytes: Some(64 * 1024 * 1024),
            memory_swap_bytes: None,
        };
        let text = render(&s, false).expect("render");
        assert!(text.contains(
            "lxc.mount.entry = /srv/my\\040data /var/lib/rootfs/c1/data none bind,ro 0 0\n"
        ));
        assert!(text.contains("lxc.cgroup.memory.limit_in_bytes = 67108864\n"));
        assert!(text.contains("lxc.cgroup.cpu.shares = 512\n"));
        assert!(!text.contains("memsw"));
    }

    #[test]
    fn newline_in_value_is_malformed() {
        let mut s = spec();
        s.hostname = "evil\nlxc.rootfs = /".into();
        assert!(matches!(
            render(&s, false),
            Err(TemplateError::Malformed { field: "hostname", .. })
        ));
    }

    #[test]
    fn write_config_creates_file_at_derived_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = DriverConfig::new(dir.path(), false);
        let path = write_config(&cfg, &spec()).expect("write");
        assert_eq!(path, dir.path().join("containers/c1/config.lxc"));
        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.contains("lxc.utsname = c1"));
    }

    #[test]
    fn write_config_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = DriverConfig::new(dir.path(), false);
        let mut s = spec();
        let _ = write_config(&cfg, &s).expect("first write");
        s.hostname = "second".into();
        let path = write_config(&cfg, &s).expect("second write");
        let content = std::fs::read_to_string(path).expect("read");
        assert!(content.contains("lxc.utsname = second"));
        assert!(!content.contains("lxc.utsname = c1"));
    }

    #[test]
    fn render_failure_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = DriverConfig::new(dir.path(), false);
        let mut s = spec();
        s.hostname = "bad\0name".into();
        let err = write_config(&cfg, &s).unwrap_err();
        assert!(matches!(err, DriverError::ConfigWrite { source: None, .. }));
        assert!(!cfg.config_path("c1").exists());
    }

    #[test]
    fn unwritable_root_is_config_write_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").expect("write");
        let cfg = DriverConfig::new(&blocker, false);
        let err = write_config(&cfg, &spec()).unwrap_err();
        assert!(matches!(err, DriverError::ConfigWrite { source: Some(_), .. }));
    }
}
