//! Running-state queries and restore polling.

use std::time::Duration;

use lxcdrv_common::error::Result;
use lxcdrv_common::types::ContainerId;

use crate::tool::{self, StatusSource};

/// Point-in-time view of one container.
pub struct Info<'a> {
    id: ContainerId,
    source: &'a dyn StatusSource,
}

impl<'a> Info<'a> {
    /// Creates a view of `id` backed by `source`.
    #[must_use]
    pub fn new(id: ContainerId, source: &'a dyn StatusSource) -> Self {
        Self { id, source }
    }

    /// Returns whether the container currently reports `RUNNING`.
    ///
    /// A failing query is logged and reported as not running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        match self.source.query_status(&self.id) {
            Ok(output) => tool::reports_running(&output),
            Err(e) => {
                tracing::error!(id = %self.id, error = %e, "error getting info for lxc container");
                false
            }
        }
    }
}

impl std::fmt::Debug for Info<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Info").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Blocks until the container stops reporting `RUNNING`.
///
/// There is no bound. A failing query is returned immediately.
///
/// # Errors
///
/// Returns the status query error.
pub fn wait_until_stopped<S: StatusSource + ?Sized>(
    source: &S,
    id: &ContainerId,
    interval: Duration,
) -> Result<()> {
    loop {
        let output = source.query_status(id)?;
        if !tool::reports_running(&output) {
            tracing::debug!(id = %id, "container no longer running");
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use lxcdrv_common::error::DriverError;

    use super::*;

    struct Countdown {
        running_for: Cell<usize>,
        fail_at: Option<usize>,
        calls: Cell<usize>,
    }

    impl StatusSource for Countdown {
        fn query_status(&self, id: &ContainerId) -> Result<String> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if self.fail_at == Some(call) {
                return Err(DriverError::StatusQuery {
                    id: id.to_string(),
                    reason: "exit status: 1".into(),
                    output: "lxc-info: not found".into(),
                });
            }
            let left = self.running_for.get();
            if left == 0 {
                return Ok("state: STOPPED\n".into());
            }
            self.running_for.set(left - 1);
            Ok("state: RUNNING\n".into())
        }
    }

    fn countdown(running_for: usize, fail_at: Option<usize>) -> Countdown {
        Countdown {
            running_for: Cell::new(running_for),
            fail_at,
            calls: Cell::new(0),
        }
    }

    #[test]
    fn is_running_reflects_status() {
        let up = countdown(1, None);
        assert!(Info::new(ContainerId::new("c1"), &up).is_running());
        let down = countdown(0, None);
        assert!(!Info::new(ContainerId::new("c1"), &down).is_running());
    }

    #[test]
    fn is_running_is_false_when_query_fails() {
        let broken = countdown(5, Some(0));
        assert!(!Info::new(ContainerId::new("c1"), &broken).is_running());
    }

    #[test]
    fn restore_polls_until_stopped() {
        let source = countdown(3, None);
        wait_until_stopped(&source, &ContainerId::new("c1"), Duration::from_millis(1)).expect("restore");
        assert_eq!(source.calls.get(), 4);
    }

    #[test]
    fn restore_does_not_retry_failures() {
        let source = countdown(3, Some(1));
        let err = wait_until_stopped(&source, &ContainerId::new("c1"), Duration::from_millis(1))
            .unwrap_err();
        assert!(matches!(err, DriverError::StatusQuery { .. }));
        assert_eq!(source.calls.get(), 2);
    }
}
