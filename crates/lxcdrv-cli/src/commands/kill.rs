//! `lxcdrv kill`: Send a signal to a container.

use std::str::FromStr;

use anyhow::Context;
use clap::Args;
use lxcdrv_common::types::ContainerId;
use lxcdrv_runtime::driver::Driver;
use nix::sys::signal::Signal;

/// Arguments for the `kill` command.
#[derive(Args, Debug)]
pub struct KillArgs {
    /// Container ID.
    pub id: String,

    /// Signal as a number or name (`9`, `KILL`, `SIGKILL`).
    #[arg(short, long, default_value = "TERM")]
    pub signal: String,
}

/// Executes the `kill` command.
///
/// # Errors
///
/// Returns an error if the signal is unknown or delivery fails.
pub fn execute(driver: &Driver, args: &KillArgs) -> anyhow::Result<()> {
    let signal = parse_signal(&args.signal)?;
    let id = ContainerId::new(args.id.as_str());
    driver
        .kill(&id, signal)
        .with_context(|| format!("signalling container {id}"))
}

/// Parses a signal number or a name with or without the `SIG` prefix.
fn parse_signal(value: &str) -> anyhow::Result<i32> {
    if let Ok(number) = value.parse::<i32>() {
        return Ok(number);
    }
    let upper = value.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    let signal = Signal::from_str(&name).with_context(|| format!("unknown signal {value:?}"))?;
    Ok(signal as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_pass_through() {
        assert_eq!(parse_signal("9").expect("signal"), 9);
        assert_eq!(parse_signal("0").expect("signal"), 0);
    }

    #[test]
    fn names_accept_optional_prefix_and_any_case() {
        assert_eq!(parse_signal("TERM").expect("signal"), 15);
        assert_eq!(parse_signal("SIGKILL").expect("signal"), 9);
        assert_eq!(parse_signal("hup").expect("signal"), 1);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(parse_signal("NOPE").is_err());
    }
}
