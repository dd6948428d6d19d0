//! # lxcdrv-core
//!
//! Read-only host inspection for the lxcdrv runtime.
//!
//! This crate provides:
//! - **Filesystem**: a parser for `/proc/<pid>/mountinfo`.
//! - **Namespaces**: detection of shared mount propagation on `/`.
//! - **Cgroups**: v1 mountpoint and membership resolution, and task list parsing.
//!
//! Nothing here creates namespaces or cgroups; LXC does that.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
