//! `lxcdrv restore`: Wait for a container to stop.

use anyhow::Context;
use clap::Args;
use lxcdrv_common::types::ContainerId;
use lxcdrv_runtime::driver::Driver;

/// Arguments for the `restore` command.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Container ID.
    pub id: String,
}

/// Executes the `restore` command. Blocks until the container stops.
///
/// # Errors
///
/// Returns an error if the status query fails.
pub fn execute(driver: &Driver, args: &RestoreArgs) -> anyhow::Result<()> {
    let id = ContainerId::new(args.id.as_str());
    tracing::info!(id = %id, "waiting for container to stop");
    driver
        .restore(&id)
        .with_context(|| format!("restoring container {id}"))?;
    println!("{id} stopped");
    Ok(())
}
