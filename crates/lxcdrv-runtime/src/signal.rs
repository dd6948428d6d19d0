//! Signal delivery to a running container.
//!
//! Older LXC ships `lxc-kill`; newer releases dropped it in favour of
//! `lxc-stop -k`. The primary tool is used when it resolves on the host.

use std::process::Command;

use lxcdrv_common::config::ToolPaths;
use lxcdrv_common::error::{DriverError, Result};
use lxcdrv_common::types::ContainerId;

use crate::tool;

/// Builds the signal command line, program first.
#[must_use]
pub fn signal_command(tools: &ToolPaths, primary_available: bool, id: &ContainerId, signal: i32) -> Vec<String> {
    let signal = signal.to_string();
    if primary_available {
        vec![tools.lxc_kill.clone(), "-n".into(), id.to_string(), signal]
    } else {
        vec![
            tools.lxc_stop.clone(),
            "-k".into(),
            "-n".into(),
            id.to_string(),
            signal,
        ]
    }
}

/// Sends `signal` to the container through `lxc-kill` or `lxc-stop -k`.
///
/// # Errors
///
/// Returns `Signal` with the combined tool output if the chosen tool cannot
/// be run or exits unsuccessfully.
pub fn send_signal(tools: &ToolPaths, id: &ContainerId, signal: i32) -> Result<()> {
    let primary_available = which::which(&tools.lxc_kill).is_ok();
    if !primary_available {
        tracing::debug!(tool = %tools.lxc_kill, "primary signal tool missing, using fallback");
    }
    let argv = signal_command(tools, primary_available, id, signal);
    let Some((program, args)) = argv.split_first() else {
        return Err(DriverError::Config {
            message: "empty signal command".into(),
        });
    };

    let mut command = Command::new(program);
    let _ = command.args(args);
    let out = tool::combined_output(command).map_err(|e| DriverError::Signal {
        id: id.to_string(),
        signal,
        reason: format!("{program}: {e}"),
        output: String::new(),
    })?;
    if !out.status.success() {
        return Err(DriverError::Signal {
            id: id.to_string(),
            signal,
            reason: format!("{program}: {}", out.status),
            output: out.output,
        });
    }
    tracing::info!(id = %id, signal, tool = %program, "signal delivered");
    Ok(())
}
