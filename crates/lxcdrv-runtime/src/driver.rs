//! The LXC driver facade.

use std::path::Path;

use lxcdrv_common::config::DriverConfig;
use lxcdrv_common::constants;
use lxcdrv_common::error::{DriverError, Result};
use lxcdrv_common::types::{ContainerId, ContainerSpec, LifecycleState};
use lxcdrv_core::cgroup::{self, tasks};
use lxcdrv_core::namespace::mount;

use crate::launch::{IoStreams, LaunchStrategy, Launcher};
use crate::lifecycle::{self, Info};
use crate::monitor::{StartMonitor, StartOutcome};
use crate::tool::LxcTools;
use crate::watcher::{self, ExitWatcher};

/// Passed to the start callback once the container is confirmed running.
#[derive(Debug, Clone)]
pub struct StartedContainer {
    /// Container identity.
    pub id: ContainerId,
    /// PID of the launcher process on the host.
    pub pid: u32,
    /// RFC 3339 timestamp of the confirmation.
    pub started_at: String,
}

/// Execution driver backed by the LXC command-line tools.
///
/// Construction inspects the host once; every launch from this driver uses
/// the same root propagation decision.
#[derive(Debug)]
pub struct Driver {
    config: DriverConfig,
    tools: LxcTools,
    launcher: Launcher,
    monitor: StartMonitor,
}

impl Driver {
    /// Creates a driver rooted at `root` with default tools and timing.
    ///
    /// # Errors
    ///
    /// See [`Driver::with_config`].
    pub fn new(root: impl Into<std::path::PathBuf>, apparmor: bool) -> Result<Self> {
        Self::with_config(DriverConfig::new(root, apparmor))
    }

    /// Creates a driver from a full configuration.
    ///
    /// Creates the root directory, links `<root>/lxc-start-unconfined` to the
    /// resolved `lxc-start` (replacing any existing link), and inspects the
    /// mount table to choose the launch strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if `lxc-start` cannot be found or the root or link
    /// cannot be created.
    pub fn with_config(config: DriverConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.root).map_err(|e| DriverError::Io {
            path: config.root.clone(),
            source: e,
        })?;
        link_unconfined_launcher(&config)?;

        let shared_root = mount::root_is_shared(&config.mountinfo_path);
        let strategy = LaunchStrategy::for_root(shared_root, &config.tools);
        tracing::info!(
            root = %config.root.display(),
            apparmor = config.apparmor,
            shared_root,
            "lxc driver initialised"
        );

        let launcher = Launcher::new(
            config.tools.lxc_start.clone(),
            config.unconfined_launcher(),
            config.apparmor,
            strategy,
        );
        Ok(Self {
            tools: LxcTools::new(config.tools.clone()),
            monitor: StartMonitor::from_timing(&config.timing),
            launcher,
            config,
        })
    }

    /// Returns the driver name including the LXC version, e.g. `lxc-0.9.0`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}-{}", constants::DRIVER_NAME, self.tools.version())
    }

    /// Returns whether launches are wrapped because `/` is shared.
    #[must_use]
    pub const fn shared_root(&self) -> bool {
        self.launcher.strategy().is_wrapped()
    }

    /// Runs a container to completion and returns its exit code.
    ///
    /// `on_start` is called once the container is confirmed running. It is
    /// not called when the process exits before confirmation. A non-zero or
    /// signaled exit (`-1`) is returned as a code, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error naming the phase that failed: config synthesis,
    /// launch, start confirmation, or waiting. After `NotRunning` the
    /// launched process is left running.
    pub fn run<F>(&self, spec: &ContainerSpec, streams: IoStreams, on_start: F) -> Result<i32>
    where
        F: FnOnce(&StartedContainer),
    {
        spec.validate()?;
        let id = &spec.id;
        let mut state = LifecycleState::Configuring;

        let config_path = crate::config::write_config(&self.config, spec)?;

        transition(id, &mut state, LifecycleState::Launching);
        let child = self.launcher.spawn(spec, &config_path, streams)?;
        let pid = child.id();
        tracing::info!(id = %id, pid, "launcher started");
        let mut exit = ExitWatcher::spawn(id.clone(), child)?;

        transition(id, &mut state, LifecycleState::AwaitingRunningConfirmation);
        let outcome = match self.monitor.wait_for_start(id, &self.tools, &mut exit) {
            Ok(outcome) => outcome,
            Err(e) => {
                if matches!(e, DriverError::NotRunning { .. }) {
                    transition(id, &mut state, LifecycleState::TimedOut);
                }
                tracing::warn!(id = %id, pid, error = %e, "container failed to start");
                return Err(e);
            }
        };

        if outcome == StartOutcome::Running {
            transition(id, &mut state, LifecycleState::Running);
            on_start(&StartedContainer {
                id: id.clone(),
                pid,
                started_at: chrono::Utc::now().to_rfc3339(),
            });
        }

        let status = exit.wait()?;
        transition(id, &mut state, LifecycleState::Exited);
        let code = watcher::exit_code(status);
        tracing::info!(id = %id, pid, code, "container exited");
        Ok(code)
    }

    /// Sends `signal` to a container.
    ///
    /// # Errors
    ///
    /// Returns `Signal` if delivery fails.
    pub fn kill(&self, id: &ContainerId, signal: i32) -> Result<()> {
        crate::signal::send_signal(&self.config.tools, id, signal)
    }

    /// Blocks until a container left over from a previous driver process is
    /// no longer running.
    ///
    /// # Errors
    ///
    /// Returns the status query error, without retrying.
    pub fn restore(&self, id: &ContainerId) -> Result<()> {
        lifecycle::wait_until_stopped(&self.tools, id, self.config.timing.restore_interval())
    }

    /// Returns a running-state view of a container.
    #[must_use]
    pub fn info(&self, id: &ContainerId) -> Info<'_> {
        Info::new(id.clone(), &self.tools)
    }

    /// Lists the kernel PIDs in a container's cgroup.
    ///
    /// # Errors
    ///
    /// Returns `CgroupResolution` if the memory hierarchy or this process's
    /// cgroup is unknown, `Io` if the task list cannot be read, or
    /// `PidParse` for a malformed entry.
    pub fn pids_for_container(&self, id: &ContainerId) -> Result<Vec<u32>> {
        let subsystem = constants::PID_SUBSYSTEM;
        let mountpoint = cgroup::find_mountpoint(&self.config.mountinfo_path, subsystem)?;
        let cgroup_dir = cgroup::this_cgroup_dir(&self.config.proc_cgroup_path, subsystem)?;
        let path = cgroup::container_tasks_path(&mountpoint, &cgroup_dir, id.as_str());
        tasks::read_tasks(&path)
    }
}

fn transition(id: &ContainerId, state: &mut LifecycleState, next: LifecycleState) {
    debug_assert!(state.can_transition_to(next), "invalid transition {state} -> {next}");
    tracing::debug!(id = %id, from = %state, to = %next, "lifecycle transition");
    *state = next;
}

/// Points `<root>/lxc-start-unconfined` at the resolved `lxc-start`.
fn link_unconfined_launcher(config: &DriverConfig) -> Result<()> {
    let tool = &config.tools.lxc_start;
    let source = which::which(tool).map_err(|e| DriverError::ToolNotFound {
        tool: tool.clone(),
        message: e.to_string(),
    })?;
    let target = config.unconfined_launcher();

    match std::fs::symlink_metadata(&target) {
        Ok(_) => std::fs::remove_file(&target).map_err(|e| io_error(&target, e))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error(&target, e)),
    }
    std::os::unix::fs::symlink(&source, &target).map_err(|e| io_error(&target, e))?;
    tracing::debug!(source = %source.display(), target = %target.display(), "linked unconfined launcher");
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> DriverError {
    DriverError::Io {
        path: path.to_path_buf(),
        source,
    }
}
