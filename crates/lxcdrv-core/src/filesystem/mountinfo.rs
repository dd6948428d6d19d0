//! Parser for the `/proc/<pid>/mountinfo` format.
//!
//! Each line looks like:
//!
//! ```text
//! 36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue
//! ```
//!
//! The optional fields between the mount options and the `-` separator carry
//! the propagation tags (`shared:N`, `master:N`, `unbindable`).

use std::path::{Path, PathBuf};

use lxcdrv_common::error::{DriverError, Result};

/// One parsed mountinfo entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Mount point relative to the process root.
    pub mount_point: PathBuf,
    /// Per-mount options.
    pub mount_options: String,
    /// Propagation tags.
    pub optional_fields: Vec<String>,
    /// Filesystem type.
    pub fs_type: String,
    /// Filesystem-specific source.
    pub source: String,
    /// Per-superblock options. Cgroup v1 mounts list their subsystems here.
    pub super_options: String,
}

impl MountInfo {
    /// Returns whether this mount is in a shared peer group.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.optional_fields.iter().any(|f| f.starts_with("shared"))
    }

    /// Returns whether the given option appears in the superblock options.
    #[must_use]
    pub fn has_super_option(&self, option: &str) -> bool {
        self.super_options.split(',').any(|o| o == option)
    }
}

/// Parses a single mountinfo line. Returns `None` for malformed lines.
#[must_use]
pub fn parse_line(line: &str) -> Option<MountInfo> {
    let mut fields = line.split_whitespace();
    let _id = fields.next()?;
    let _parent = fields.next()?;
    let _dev = fields.next()?;
    let _root = fields.next()?;
    let mount_point = PathBuf::from(unescape(fields.next()?));
    let mount_options = fields.next()?.to_string();

    let mut optional_fields = Vec::new();
    loop {
        match fields.next()? {
            "-" => break,
            tag => optional_fields.push(tag.to_string()),
        }
    }

    let fs_type = fields.next()?.to_string();
    let source = fields.next()?.to_string();
    let super_options = fields.next().unwrap_or_default().to_string();

    Some(MountInfo {
        mount_point,
        mount_options,
        optional_fields,
        fs_type,
        source,
        super_options,
    })
}

/// Parses every well-formed line of a mountinfo document.
#[must_use]
pub fn parse(content: &str) -> Vec<MountInfo> {
    content.lines().filter_map(parse_line).collect()
}

/// Reads and parses a mountinfo file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read(path: &Path) -> Result<Vec<MountInfo>> {
    let content = std::fs::read_to_string(path).map_err(|e| DriverError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let entries = parse(&content);
    tracing::trace!(path = %path.display(), count = entries.len(), "parsed mountinfo");
    Ok(entries)
}

/// Decodes the octal escapes (`\040` for space) the kernel uses in paths.
fn unescape(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_string();
    }
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
