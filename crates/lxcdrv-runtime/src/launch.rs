//! `lxc-start` command line assembly and process launch.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use lxcdrv_common::config::ToolPaths;
use lxcdrv_common::constants;
use lxcdrv_common::error::{DriverError, Result};
use lxcdrv_common::types::ContainerSpec;

use crate::shell;

/// How the launcher is invoked relative to the host mount namespace.
///
/// Chosen once per driver from the propagation of `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// Run `lxc-start` directly.
    Direct,
    /// Run `lxc-start` inside a fresh mount namespace whose `/` is a slave,
    /// so its unmounts cannot propagate back to the host.
    PrivateMounts {
        /// Mount namespace wrapper binary.
        unshare: String,
        /// Shell that remounts `/` and execs the launcher.
        shell: String,
    },
}

impl LaunchStrategy {
    /// Selects the strategy for a host whose root is or is not shared.
    #[must_use]
    pub fn for_root(shared_root: bool, tools: &ToolPaths) -> Self {
        if shared_root {
            Self::PrivateMounts {
                unshare: tools.unshare.clone(),
                shell: tools.shell.clone(),
            }
        } else {
            Self::Direct
        }
    }

    /// Returns whether launches are wrapped in a private mount namespace.
    #[must_use]
    pub const fn is_wrapped(&self) -> bool {
        matches!(self, Self::PrivateMounts { .. })
    }

    /// Applies the strategy to a launcher argument vector.
    #[must_use]
    pub fn wrap(&self, argv: Vec<String>) -> Vec<String> {
        match self {
            Self::Direct => argv,
            Self::PrivateMounts { unshare, shell } => {
                let script = format!(
                    "mount --make-rslave /; exec {}",
                    shell::quote_arguments(&argv)
                );
                vec![
                    unshare.clone(),
                    "-m".into(),
                    "--".into(),
                    shell.clone(),
                    "-c".into(),
                    script,
                ]
            }
        }
    }
}

/// Stdio attachments for the launched process. `None` inherits the driver's.
#[derive(Debug, Default)]
pub struct IoStreams {
    /// Standard input.
    pub stdin: Option<Stdio>,
    /// Standard output.
    pub stdout: Option<Stdio>,
    /// Standard error.
    pub stderr: Option<Stdio>,
}

impl IoStreams {
    /// Inherits all three streams from the driver process.
    #[must_use]
    pub fn inherit() -> Self {
        Self::default()
    }

    /// Attaches all three streams to `/dev/null`.
    #[must_use]
    pub fn null() -> Self {
        Self {
            stdin: Some(Stdio::null()),
            stdout: Some(Stdio::null()),
            stderr: Some(Stdio::null()),
        }
    }

    fn apply(self, command: &mut Command) {
        if let Some(stdin) = self.stdin {
            let _ = command.stdin(stdin);
        }
        if let Some(stdout) = self.stdout {
            let _ = command.stdout(stdout);
        }
        if let Some(stderr) = self.stderr {
            let _ = command.stderr(stderr);
        }
    }
}

/// Builds and starts `lxc-start` invocations for one driver.
#[derive(Debug, Clone)]
pub struct Launcher {
    program: String,
    unconfined_program: PathBuf,
    apparmor: bool,
    strategy: LaunchStrategy,
}

impl Launcher {
    /// Creates a launcher.
    ///
    /// `unconfined_program` replaces `program` for privileged containers
    /// when `AppArmor` is enabled.
    #[must_use]
    pub const fn new(
        program: String,
        unconfined_program: PathBuf,
        apparmor: bool,
        strategy: LaunchStrategy,
    ) -> Self {
        Self {
            program,
            unconfined_program,
            apparmor,
            strategy,
        }
    }

    /// Returns the launch strategy.
    #[must_use]
    pub const fn strategy(&self) -> &LaunchStrategy {
        &self.strategy
    }

    /// Builds the unwrapped `lxc-start` argument vector, program first.
    #[must_use]
    pub fn args(&self, spec: &ContainerSpec, config_path: &Path) -> Vec<String> {
        let mut argv = vec![
            self.program.clone(),
            "-n".into(),
            spec.id.to_string(),
            "-f".into(),
            config_path.to_string_lossy().into_owned(),
            "--".into(),
            spec.init_path.to_string_lossy().into_owned(),
            "-driver".into(),
            constants::DRIVER_NAME.into(),
        ];

        if let Some(net) = &spec.network {
            argv.extend([
                "-g".into(),
                net.gateway.clone(),
                "-i".into(),
                net.cidr(),
                "-mtu".into(),
                net.mtu.to_string(),
            ]);
        }

        if !spec.user.is_empty() {
            argv.extend(["-u".into(), spec.user.clone()]);
        }

        if spec.privileged {
            if self.apparmor {
                argv[0] = self.unconfined_program.to_string_lossy().into_owned();
            }
            argv.push("-privileged".into());
        }

        if !spec.working_dir.is_empty() {
            argv.extend(["-w".into(), spec.working_dir.clone()]);
        }

        argv.push("--".into());
        argv.push(spec.entrypoint.clone());
        argv.extend(spec.arguments.iter().cloned());
        argv
    }

    /// Builds the full command line, wrapped according to the strategy.
    #[must_use]
    pub fn command_line(&self, spec: &ContainerSpec, config_path: &Path) -> Vec<String> {
        self.strategy.wrap(self.args(spec, config_path))
    }

    /// Starts the launcher without waiting for it.
    ///
    /// The program is resolved through `PATH`, falling back to the bare name;
    /// `argv[0]` keeps the unresolved name. A non-empty spec environment
    /// replaces the driver's environment.
    ///
    /// # Errors
    ///
    /// Returns `Launch` if the process cannot be spawned.
    pub fn spawn(
        &self,
        spec: &ContainerSpec,
        config_path: &Path,
        streams: IoStreams,
    ) -> Result<Child> {
        let argv = self.command_line(spec, config_path);
        let Some((name, rest)) = argv.split_first() else {
            return Err(DriverError::Config {
                message: "empty launch command".into(),
            });
        };
        let resolved = which::which(name).unwrap_or_else(|_| PathBuf::from(name));

        let mut command = Command::new(&resolved);
        let _ = command.arg0(name).args(rest);
        if !spec.env.is_empty() {
            let _ = command.env_clear().envs(spec.env.iter().map(|(k, v)| (k, v)));
        }
        streams.apply(&mut command);

        tracing::debug!(id = %spec.id, program = %resolved.display(), args = ?rest, "spawning launcher");
        command.spawn().map_err(|e| DriverError::Launch {
            program: name.clone(),
            source: e,
        })
    }
}
