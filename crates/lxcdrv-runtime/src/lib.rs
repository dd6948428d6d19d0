//! LXC execution driver for the lxcdrv runtime.
//!
//! [`driver::Driver`] launches one container per [`driver::Driver::run`]
//! call through `lxc-start`, confirms it reached `RUNNING` while watching
//! for early exit, hands the caller a start notification, and reports the
//! exit code. Signalling, state queries, and cgroup PID discovery work
//! against any container ID, live or historical.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod config;
pub mod driver;
pub mod launch;
pub mod lifecycle;
pub mod monitor;
pub mod shell;
pub mod signal;
pub mod tool;
pub mod watcher;
