//! Exit watching for the launched process.
//!
//! A dedicated thread owns the [`Child`] and blocks in `wait`. Its result
//! is delivered exactly once over a channel, which doubles as the one-shot
//! completion indicator the start monitor polls.

use std::io;
use std::process::{Child, ExitStatus};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};

use lxcdrv_common::constants;
use lxcdrv_common::error::{DriverError, Result};
use lxcdrv_common::types::ContainerId;

/// One-shot completion indicator checked without blocking.
pub trait ExitSignal {
    /// Returns whether the process has exited. Once `true`, stays `true`.
    fn has_fired(&mut self) -> bool;
}

/// Handle on the exit-watcher thread of one launch.
#[derive(Debug)]
pub struct ExitWatcher {
    id: ContainerId,
    rx: Receiver<io::Result<ExitStatus>>,
    result: Option<io::Result<ExitStatus>>,
}

impl ExitWatcher {
    /// Hands `child` to a new thread that waits for it to exit.
    ///
    /// If the thread cannot be started the child is killed and reaped here,
    /// so no launcher outlives a failed watch.
    ///
    /// # Errors
    ///
    /// Returns `Wait` if the thread cannot be spawned.
    pub fn spawn(id: ContainerId, child: Child) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let pid = child.id();
        let slot = Arc::new(Mutex::new(Some(child)));
        let thread_slot = Arc::clone(&slot);
        let thread_id = id.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("exit-watcher-{id}"))
            .spawn(move || {
                let Some(mut child) = take_child(&thread_slot) else {
                    return;
                };
                let result = child.wait();
                match &result {
                    Ok(status) => {
                        tracing::debug!(id = %thread_id, pid, %status, "launcher exited");
                    }
                    Err(e) => tracing::warn!(id = %thread_id, pid, error = %e, "wait failed"),
                }
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            tracing::warn!(id = %id, pid, error = %e, "cannot start exit watcher, killing launcher");
            let _ = reap_unwatched(&slot);
            return Err(DriverError::Wait {
                id: id.to_string(),
                source: e,
            });
        }
        Ok(Self {
            id,
            rx,
            result: None,
        })
    }

    /// Blocks until the process exits and returns its status.
    ///
    /// A non-zero or signaled exit is a status, not an error.
    ///
    /// # Errors
    ///
    /// Returns `Wait` if waiting on the process failed.
    pub fn wait(mut self) -> Result<ExitStatus> {
        let result = match self.result.take() {
            Some(result) => result,
            None => self.rx.recv().unwrap_or_else(|_| Err(watcher_vanished())),
        };
        result.map_err(|e| DriverError::Wait {
            id: self.id.to_string(),
            source: e,
        })
    }
}

impl ExitSignal for ExitWatcher {
    fn has_fired(&mut self) -> bool {
        if self.result.is_some() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.result = Some(result);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.result = Some(Err(watcher_vanished()));
                true
            }
        }
    }
}

/// Returns the exit code of a finished process, or `-1` if it was signaled.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(constants::SIGNALED_EXIT_CODE)
}

fn take_child(slot: &Mutex<Option<Child>>) -> Option<Child> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}

/// Kills and waits for a child no watcher thread took ownership of.
fn reap_unwatched(slot: &Mutex<Option<Child>>) -> Option<ExitStatus> {
    let mut child = take_child(slot)?;
    let _ = child.kill();
    child.wait().ok()
}

fn watcher_vanished() -> io::Error {
    io::Error::other("exit watcher stopped without reporting a status")
}
