//! `lxcdrv pids`: List the PIDs in a container's cgroup.

use anyhow::Context;
use clap::Args;
use lxcdrv_common::types::ContainerId;
use lxcdrv_runtime::driver::Driver;

/// Arguments for the `pids` command.
#[derive(Args, Debug)]
pub struct PidsArgs {
    /// Container ID.
    pub id: String,

    /// Print a JSON array instead of one PID per line.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `pids` command.
///
/// # Errors
///
/// Returns an error if the container cgroup cannot be resolved or read.
pub fn execute(driver: &Driver, args: &PidsArgs) -> anyhow::Result<()> {
    let id = ContainerId::new(args.id.as_str());
    let pids = driver
        .pids_for_container(&id)
        .with_context(|| format!("listing pids of container {id}"))?;

    if args.json {
        println!("{}", serde_json::to_string(&pids)?);
    } else {
        for pid in &pids {
            println!("{pid}");
        }
    }
    Ok(())
}
