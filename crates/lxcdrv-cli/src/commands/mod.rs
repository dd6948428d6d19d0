//! CLI command definitions and dispatch.

pub mod info;
pub mod kill;
pub mod pids;
pub mod restore;
pub mod run;
pub mod version;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lxcdrv_common::config::DriverConfig;
use lxcdrv_runtime::driver::Driver;

/// lxcdrv: run and manage containers through the LXC tools.
#[derive(Parser, Debug)]
#[command(name = "lxcdrv", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON driver configuration file. Flags below override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Driver root directory.
    #[arg(long, global = true, env = "LXCDRV_ROOT")]
    pub root: Option<PathBuf>,

    /// Treat `AppArmor` as enabled on the host.
    #[arg(long, global = true, env = "LXCDRV_APPARMOR")]
    pub apparmor: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch a container and wait for it to exit.
    Run(run::RunArgs),
    /// Send a signal to a container.
    Kill(kill::KillArgs),
    /// Wait for a container from a previous driver process to stop.
    Restore(restore::RestoreArgs),
    /// Report whether a container is running.
    Info(info::InfoArgs),
    /// List the PIDs in a container's cgroup.
    Pids(pids::PidsArgs),
    /// Print the driver name and LXC version.
    Version,
}

impl Cli {
    /// Builds the driver configuration from the file and flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn driver_config(&self) -> anyhow::Result<DriverConfig> {
        let mut config = match &self.config {
            Some(path) => DriverConfig::load(path)
                .with_context(|| format!("loading driver config {}", path.display()))?,
            None => DriverConfig::default(),
        };
        if let Some(root) = &self.root {
            config.root.clone_from(root);
        }
        if self.apparmor {
            config.apparmor = true;
        }
        Ok(config)
    }

    fn driver(&self) -> anyhow::Result<Driver> {
        let config = self.driver_config()?;
        Driver::with_config(config).context("initialising lxc driver")
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if driver initialisation or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let driver = cli.driver()?;
    match cli.command {
        Command::Run(args) => run::execute(&driver, args),
        Command::Kill(args) => kill::execute(&driver, &args),
        Command::Restore(args) => restore::execute(&driver, &args),
        Command::Info(args) => info::execute(&driver, &args),
        Command::Pids(args) => pids::execute(&driver, &args),
        Command::Version => {
            version::execute(&driver);
            Ok(())
        }
    }
}
