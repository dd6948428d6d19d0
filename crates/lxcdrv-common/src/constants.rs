//! System-wide constants, tool names, and default paths.

/// Name this driver registers under and passes to the init stage.
pub const DRIVER_NAME: &str = "lxc";

/// Default root directory for per-container configuration and helpers.
pub const DEFAULT_ROOT: &str = "/var/lib/lxcdrv";

/// Directory under the driver root holding one subdirectory per container.
pub const CONTAINERS_DIR: &str = "containers";

/// File name of the rendered LXC configuration inside a container directory.
pub const CONFIG_FILE_NAME: &str = "config.lxc";

/// Name of the symlink to `lxc-start` used for privileged launches under `AppArmor`.
pub const UNCONFINED_LAUNCHER: &str = "lxc-start-unconfined";

/// Default launcher binary.
pub const LXC_START: &str = "lxc-start";
/// Default status query binary.
pub const LXC_INFO: &str = "lxc-info";
/// Default primary signal delivery binary.
pub const LXC_KILL: &str = "lxc-kill";
/// Default fallback signal delivery binary.
pub const LXC_STOP: &str = "lxc-stop";
/// Default version query binary.
pub const LXC_VERSION: &str = "lxc-version";
/// Default mount namespace unsharing wrapper.
pub const UNSHARE: &str = "unshare";
/// Shell used to run the wrapped command line.
pub const SHELL: &str = "/bin/sh";

/// Substring of the status query output that confirms a running container.
pub const RUNNING_MARKER: &str = "RUNNING";

/// Interval between status queries while waiting for start confirmation.
pub const START_POLL_INTERVAL_MS: u64 = 50;
/// Upper bound on the start confirmation wait.
pub const START_TIMEOUT_MS: u64 = 5_000;
/// Interval between status queries while restoring.
pub const RESTORE_POLL_INTERVAL_MS: u64 = 500;

/// Mount table of the calling process.
pub const PROC_SELF_MOUNTINFO: &str = "/proc/self/mountinfo";
/// Cgroup membership of the calling process.
pub const PROC_SELF_CGROUP: &str = "/proc/self/cgroup";

/// Cgroup subsystem used to locate container task lists. Every subsystem
/// co-locates the container's task group, so any mounted one works.
pub const PID_SUBSYSTEM: &str = "memory";

/// Task list file inside a cgroup directory.
pub const CGROUP_TASKS_FILE: &str = "tasks";

/// Subdirectory newer LXC releases nest container cgroups under.
pub const LXC_CGROUP_NEST: &str = "lxc";

/// Exit code reported when the process was terminated by a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;
