//! Start confirmation.
//!
//! LXC has no event interface, so the driver polls `lxc-info -s` at a fixed
//! interval under a fixed bound until the container reports `RUNNING`. The
//! launched process may also finish before that happens; the exit watcher's
//! indicator is checked first on every iteration, and an exit counts as a
//! successful start.

use std::time::{Duration, Instant};

use lxcdrv_common::config::PollTiming;
use lxcdrv_common::error::{DriverError, Result};
use lxcdrv_common::types::ContainerId;

use crate::tool::{self, StatusSource};
use crate::watcher::ExitSignal;

/// How the start wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The status query reported `RUNNING`.
    Running,
    /// The process exited before `RUNNING` was observed.
    Exited,
}

/// Bounded poller for start confirmation.
#[derive(Debug, Clone, Copy)]
pub struct StartMonitor {
    interval: Duration,
    timeout: Duration,
}

impl StartMonitor {
    /// Creates a monitor with an explicit interval and bound.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Creates a monitor from configured timing.
    #[must_use]
    pub const fn from_timing(timing: &PollTiming) -> Self {
        Self::new(timing.start_interval(), timing.start_timeout())
    }

    /// Waits until the container runs or exits, whichever is seen first.
    ///
    /// The bound is measured from entry and no sleep runs past it. A failing
    /// status query is retried once; a second failure is returned.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` when the bound elapses, or the query error.
    pub fn wait_for_start<S, E>(
        &self,
        id: &ContainerId,
        source: &S,
        exit: &mut E,
    ) -> Result<StartOutcome>
    where
        S: StatusSource + ?Sized,
        E: ExitSignal + ?Sized,
    {
        let start = Instant::now();
        loop {
            // Also runs after the final sleep: an exit inside the bound is never a timeout.
            if exit.has_fired() {
                tracing::debug!(id = %id, "process exited before start confirmation");
                return Ok(StartOutcome::Exited);
            }
            if start.elapsed() >= self.timeout {
                break;
            }

            let output = query_with_retry(id, source)?;
            if tool::reports_running(&output) {
                tracing::debug!(id = %id, elapsed_ms = start.elapsed().as_millis(), "container running");
                return Ok(StartOutcome::Running);
            }
            let remaining = self.timeout.saturating_sub(start.elapsed());
            std::thread::sleep(self.interval.min(remaining));
        }
        Err(DriverError::NotRunning {
            id: id.to_string(),
            timeout: self.timeout,
        })
    }
}

fn query_with_retry<S: StatusSource + ?Sized>(id: &ContainerId, source: &S) -> Result<String> {
    match source.query_status(id) {
        Ok(output) => Ok(output),
        Err(e) => {
            tracing::debug!(id = %id, error = %e, "status query failed, retrying once");
            source.query_status(id)
        }
    }
}
