//! Mount namespace inspection.
//!
//! LXC unmounts parts of the container's view during teardown. Under shared
//! propagation those unmounts would reach the host, so the driver needs to
//! know how `/` is mounted before it launches anything.

pub mod mount;
