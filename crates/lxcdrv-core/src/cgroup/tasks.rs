//! Cgroup `tasks` file parsing.

use std::path::Path;

use lxcdrv_common::error::{DriverError, Result};

/// Parses a newline-separated PID list, skipping blank lines.
///
/// # Errors
///
/// Returns `PidParse` naming the first line that is not a valid PID.
pub fn parse_tasks(content: &str) -> Result<Vec<u32>> {
    let mut pids = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let pid = line.parse::<u32>().map_err(|e| DriverError::PidParse {
            line: line.to_string(),
            source: e,
        })?;
        pids.push(pid);
    }
    Ok(pids)
}

/// Reads and parses a `tasks` file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, or `PidParse` for a bad entry.
pub fn read_tasks(path: &Path) -> Result<Vec<u32>> {
    let content = std::fs::read_to_string(path).map_err(|e| DriverError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let pids = parse_tasks(&content)?;
    tracing::debug!(path = %path.display(), count = pids.len(), "read cgroup tasks");
    Ok(pids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse_tasks("123\n456\n\n").expect("parse"), vec![123, 456]);
    }

    #[test]
    fn empty_file_yields_no_pids() {
        assert!(parse_tasks("").expect("parse").is_empty());
    }

    #[test]
    fn invalid_line_is_named_in_error() {
        let err = parse_tasks("123\nabc\n").unwrap_err();
        match err {
            DriverError::PidParse { line, .. } => assert_eq!(line, "abc"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_pid_is_rejected() {
        assert!(parse_tasks("-1\n").is_err());
    }

    #[test]
    fn read_tasks_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_tasks(&dir.path().join("tasks")).unwrap_err();
        assert!(matches!(err, DriverError::Io { .. }));
    }
}
