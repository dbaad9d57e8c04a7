//! Change detection by `(size, modified_at)` fingerprint.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::error::{io_err, DaemonError};

/// Cheap change proxy for the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFingerprint {
    pub size: u64,
    pub modified_at: SystemTime,
}

/// Current fingerprint of `path`, or `None` if it does not exist.
pub fn snapshot(path: &Path) -> Result<Option<FileFingerprint>, DaemonError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };
    let modified_at = meta.modified().map_err(|e| io_err(path, e))?;
    Ok(Some(FileFingerprint {
        size: meta.len(),
        modified_at,
    }))
}

/// `true` unless both fields match the previous baseline.
///
/// No baseline counts as changed. A shrink is a change like any other, so a
/// truncate-then-rewrite by the upstream writer is picked up.
pub fn has_changed(previous: Option<&FileFingerprint>, current: &FileFingerprint) -> bool {
    previous != Some(current)
}
