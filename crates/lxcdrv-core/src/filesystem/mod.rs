//! Filesystem inspection helpers.

pub mod mountinfo;
