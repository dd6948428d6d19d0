//! Cgroup v1 discovery.
//!
//! LXC places each container in a cgroup named after it, below the cgroup
//! of the process that launched it. Locating that directory takes two
//! lookups: where the subsystem hierarchy is mounted, and which cgroup the
//! current process belongs to within it.

pub mod tasks;

use std::path::{Path, PathBuf};

use lxcdrv_common::constants;
use lxcdrv_common::error::{DriverError, Result};

use crate::filesystem::mountinfo;

/// Finds the mountpoint of the cgroup v1 hierarchy carrying `subsystem`.
///
/// # Errors
///
/// Returns `CgroupResolution` if no such hierarchy is mounted, or `Io` if
/// the mount table cannot be read.
pub fn find_mountpoint(mountinfo_path: &Path, subsystem: &str) -> Result<PathBuf> {
    let entries = mountinfo::read(mountinfo_path)?;
    entries
        .into_iter()
        .find(|e| e.fs_type == "cgroup" && e.has_super_option(subsystem))
        .map(|e| e.mount_point)
        .ok_or_else(|| DriverError::CgroupResolution {
            subsystem: subsystem.to_string(),
            message: format!("no cgroup mount in {}", mountinfo_path.display()),
        })
}

/// Returns the cgroup path of the current process for `subsystem`, as
/// listed in a `/proc/<pid>/cgroup` document.
///
/// # Errors
///
/// Returns `CgroupResolution` if the subsystem is not listed.
pub fn cgroup_dir_in(content: &str, subsystem: &str) -> Result<String> {
    for line in content.lines() {
        let mut parts = line.splitn(3, ':');
        let (Some(_hierarchy), Some(controllers), Some(path)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        if controllers.split(',').any(|c| c == subsystem) {
            return Ok(path.to_string());
        }
    }
    Err(DriverError::CgroupResolution {
        subsystem: subsystem.to_string(),
        message: "subsystem not listed in process cgroup membership".into(),
    })
}

/// Reads the cgroup membership file and returns the directory for `subsystem`.
///
/// # Errors
///
/// Returns `Io` if the file is unreadable, or `CgroupResolution` if the
/// subsystem is not listed.
pub fn this_cgroup_dir(proc_cgroup_path: &Path, subsystem: &str) -> Result<String> {
    let content = std::fs::read_to_string(proc_cgroup_path).map_err(|e| DriverError::Io {
        path: proc_cgroup_path.to_path_buf(),
        source: e,
    })?;
    cgroup_dir_in(&content, subsystem)
}

/// Returns the task list path of a container.
///
/// Prefers `<mount>/<dir>/<id>/tasks` and falls back to the
/// `<mount>/<dir>/lxc/<id>/tasks` layout of newer LXC releases when the
/// first does not exist.
#[must_use]
pub fn container_tasks_path(mountpoint: &Path, cgroup_dir: &str, id: &str) -> PathBuf {
    let base = mountpoint.join(cgroup_dir.trim_start_matches('/'));
    let direct = base.join(id).join(constants::CGROUP_TASKS_FILE);
    if direct.exists() {
        return direct;
    }
    base.join(constants::LXC_CGROUP_NEST)
        .join(id)
        .join(constants::CGROUP_TASKS_FILE)
}
