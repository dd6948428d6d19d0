//! `lxcdrv info`: Report whether a container is running.

use clap::Args;
use lxcdrv_common::types::ContainerId;
use lxcdrv_runtime::driver::Driver;

/// Arguments for the `info` command.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Container ID.
    pub id: String,

    /// Print a JSON object instead of plain text.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `info` command.
///
/// # Errors
///
/// Returns an error if JSON encoding fails.
pub fn execute(driver: &Driver, args: &InfoArgs) -> anyhow::Result<()> {
    let id = ContainerId::new(args.id.as_str());
    let running = driver.info(&id).is_running();
    if args.json {
        let value = serde_json::json!({ "id": id.as_str(), "running": running });
        println!("{}", serde_json::to_string(&value)?);
    } else {
        println!("{id}\t{}", if running { "running" } else { "stopped" });
    }
    Ok(())
}
