//! Invocation of the auxiliary LXC command-line tools.
//!
//! LXC offers no structured interface: exit status and combined
//! stdout/stderr are the whole contract. Output is captured through a
//! single pipe shared by both streams so it keeps the order the tool wrote it.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};

use lxcdrv_common::config::ToolPaths;
use lxcdrv_common::constants;
use lxcdrv_common::error::{DriverError, Result};
use lxcdrv_common::types::ContainerId;
use nix::fcntl::OFlag;

/// Exit status and interleaved output of a finished tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit status of the tool.
    pub status: ExitStatus,
    /// Combined stdout and stderr.
    pub output: String,
}

/// Runs a command to completion, capturing stdout and stderr together.
///
/// # Errors
///
/// Returns an error if the pipe cannot be created, the command cannot be
/// spawned, or waiting on it fails.
pub fn combined_output(mut command: Command) -> std::io::Result<ToolOutput> {
    let (reader, writer) = nix::unistd::pipe2(OFlag::O_CLOEXEC).map_err(std::io::Error::from)?;
    let writer_err = writer.try_clone()?;
    let _ = command
        .stdin(Stdio::null())
        .stdout(Stdio::from(writer))
        .stderr(Stdio::from(writer_err));
    let mut child = command.spawn()?;
    // The command keeps our copies of the write end open until dropped.
    drop(command);

    let mut raw = Vec::new();
    let read_result = std::fs::File::from(reader).read_to_end(&mut raw);
    let status = child.wait()?;
    let _ = read_result?;
    Ok(ToolOutput {
        status,
        output: String::from_utf8_lossy(&raw).into_owned(),
    })
}

/// Source of point-in-time container status text.
pub trait StatusSource {
    /// Queries the current status of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot run or exits unsuccessfully.
    fn query_status(&self, id: &ContainerId) -> Result<String>;
}

/// Returns whether status output confirms a running container.
#[must_use]
pub fn reports_running(output: &str) -> bool {
    output.contains(constants::RUNNING_MARKER)
}

/// Extracts the version from `lxc-version` output such as `lxc version: 0.9.0`.
///
/// Returns an empty string when the output has no `:`.
#[must_use]
pub fn parse_version(output: &str) -> String {
    output
        .split_once(':')
        .map(|(_, version)| version.trim().to_string())
        .unwrap_or_default()
}

/// The auxiliary LXC tools configured for a driver.
#[derive(Debug, Clone)]
pub struct LxcTools {
    paths: ToolPaths,
}

impl LxcTools {
    /// Creates a tool set from configured names or paths.
    #[must_use]
    pub const fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    /// Returns the LXC version, or an empty string if it cannot be determined.
    #[must_use]
    pub fn version(&self) -> String {
        let mut command = Command::new(&self.paths.lxc_version);
        let _ = command.env("LC_ALL", "C");
        match combined_output(command) {
            Ok(out) if out.status.success() => parse_version(&out.output),
            Ok(out) => {
                tracing::debug!(status = %out.status, "lxc-version failed");
                String::new()
            }
            Err(e) => {
                tracing::debug!(error = %e, "lxc-version unavailable");
                String::new()
            }
        }
    }
}

impl StatusSource for LxcTools {
    fn query_status(&self, id: &ContainerId) -> Result<String> {
        let mut command = Command::new(&self.paths.lxc_info);
        let _ = command.args(["-s", "-n", id.as_str()]);
        let out = combined_output(command).map_err(|e| DriverError::StatusQuery {
            id: id.to_string(),
            reason: e.to_string(),
            output: String::new(),
        })?;
        if !out.status.success() {
            return Err(DriverError::StatusQuery {
                id: id.to_string(),
                reason: out.status.to_string(),
                output: out.output,
            });
        }
        Ok(out.output)
    }
}
