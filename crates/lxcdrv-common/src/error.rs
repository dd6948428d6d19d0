//! Unified error types for the lxcdrv workspace.
//!
//! Every variant names the lifecycle phase that failed, so callers can tell
//! a configuration problem from a launch failure or a start timeout.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DriverError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration or container specification value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The LXC configuration file could not be rendered or written.
    #[error("failed to write container config {path}: {message}")]
    ConfigWrite {
        /// Target configuration file.
        path: PathBuf,
        /// What went wrong.
        message: String,
        /// Underlying I/O error, absent for render failures.
        #[source]
        source: Option<std::io::Error>,
    },

    /// A required external tool could not be located.
    #[error("{tool} not found: {message}")]
    ToolNotFound {
        /// Tool name or path that was looked up.
        tool: String,
        /// Lookup failure description.
        message: String,
    },

    /// The launcher process could not be started at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that failed to spawn.
        program: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// The container did not report a running state in time.
    ///
    /// The launched process is not killed and may still be running.
    #[error("container {id} did not reach RUNNING within {}ms", timeout.as_millis())]
    NotRunning {
        /// Container that failed to start.
        id: String,
        /// Bound that elapsed.
        timeout: Duration,
    },

    /// The status query tool failed.
    #[error("status query for {id} failed: {reason} (output: {output})")]
    StatusQuery {
        /// Container that was queried.
        id: String,
        /// Spawn error or exit status.
        reason: String,
        /// Combined stdout/stderr of the query.
        output: String,
    },

    /// Signal delivery failed.
    #[error("failed to send signal {signal} to {id}: {reason} (output: {output})")]
    Signal {
        /// Target container.
        id: String,
        /// Signal number.
        signal: i32,
        /// Spawn error or exit status of the signal tool.
        reason: String,
        /// Combined stdout/stderr of the signal tool.
        output: String,
    },

    /// Waiting for the launched process failed.
    #[error("failed to wait for container {id}: {source}")]
    Wait {
        /// Container whose process could not be waited on.
        id: String,
        /// Underlying wait error.
        source: std::io::Error,
    },

    /// A cgroup task list entry is not a valid PID.
    #[error("invalid pid '{line}': {source}")]
    PidParse {
        /// Offending line.
        line: String,
        /// Underlying parse error.
        source: std::num::ParseIntError,
    },

    /// The cgroup mountpoint or this process's cgroup directory is unknown.
    #[error("cannot resolve cgroup for subsystem {subsystem}: {message}")]
    CgroupResolution {
        /// Subsystem being resolved.
        subsystem: String,
        /// Description of the failure.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_running_reports_timeout_in_millis() {
        let err = DriverError::NotRunning {
            id: "c1".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "container c1 did not reach RUNNING within 5000ms");
    }

    #[test]
    fn pid_parse_names_offending_line() {
        let source = "abc".parse::<u32>().unwrap_err();
        let err = DriverError::PidParse {
            line: "abc".into(),
            source,
        };
        assert!(err.to_string().contains("'abc'"));
    }

    #[test]
    fn signal_error_carries_output() {
        let err = DriverError::Signal {
            id: "c1".into(),
            signal: 15,
            reason: "exit status: 1".into(),
            output: "no such container".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("signal 15"));
        assert!(msg.contains("no such container"));
    }
}
