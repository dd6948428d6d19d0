//! # lxcdrv-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the entire lxcdrv workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the container specification, the driver
//! configuration, and the error taxonomy that every other crate builds on.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
