//! Root mount propagation detection.

use std::path::Path;

use crate::filesystem::mountinfo::{self, MountInfo};

/// Returns whether `/` is mounted with shared propagation.
///
/// Reads the given mountinfo file. When the file cannot be read or has no
/// entry for `/`, the root is assumed shared so launches get wrapped.
#[must_use]
pub fn root_is_shared(mountinfo_path: &Path) -> bool {
    match mountinfo::read(mountinfo_path) {
        Ok(entries) => root_is_shared_in(&entries).unwrap_or_else(|| {
            tracing::warn!(path = %mountinfo_path.display(), "no mount entry for /, assuming shared");
            true
        }),
        Err(e) => {
            tracing::warn!(error = %e, "cannot inspect root propagation, assuming shared");
            true
        }
    }
}

/// Returns the propagation of `/` in parsed entries, or `None` if absent.
#[must_use]
pub fn root_is_shared_in(entries: &[MountInfo]) -> Option<bool> {
    entries
        .iter()
        .find(|e| e.mount_point == Path::new("/"))
        .map(MountInfo::is_shared)
}
