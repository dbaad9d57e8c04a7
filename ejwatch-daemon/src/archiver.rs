//! Dump archiver: moves the pre-rollover journal out of the way.
//!
//! The source is never removed before its archived copy is confirmed on disk.
//! Same-volume moves are a single `rename`; anything else falls back to
//! copy → fsync → rename-into-place → remove-source.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use filetime::FileTime;

use crate::error::{io_err, DaemonError};
use crate::paths::{dump_path, partial_path};

/// Upper bound on `_n` suffixes tried for one timestamp.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Move `source` into `dump_directory` as `EJ_dump_<timestamp>.log`.
///
/// Returns `Ok(None)` if there is nothing to archive.
pub fn archive(
    source: &Path,
    dump_directory: &Path,
    now: NaiveDateTime,
) -> Result<Option<PathBuf>, DaemonError> {
    match fs::symlink_metadata(source) {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(source, err)),
    }

    fs::create_dir_all(dump_directory).map_err(|e| io_err(dump_directory, e))?;

    let target = free_dump_path(dump_directory, now)?;
    move_file(source, &target)?;
    Ok(Some(target))
}

fn free_dump_path(dump_directory: &Path, now: NaiveDateTime) -> Result<PathBuf, DaemonError> {
    (0..MAX_NAME_ATTEMPTS)
        .map(|attempt| dump_path(dump_directory, now, attempt))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| {
            io_err(
                dump_directory,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "no free archive name for this timestamp",
                ),
            )
        })
}

/// Rename `source` to `destination`, degrading to a confirmed copy + delete.
pub fn move_file(source: &Path, destination: &Path) -> Result<(), DaemonError> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) if !source.exists() => Err(io_err(source, err)),
        Err(err) => {
            tracing::debug!(
                source = %source.display(),
                destination = %destination.display(),
                error = %err,
                "rename failed, falling back to copy",
            );
            copy_then_remove(source, destination)
        }
    }
}

/// Copy to a sibling partial file, sync it, rename it into place, and only
/// then remove `source`. On any failure before the rename the partial file is
/// removed and `source` is untouched.
pub(crate) fn copy_then_remove(source: &Path, destination: &Path) -> Result<(), DaemonError> {
    let partial = partial_path(destination);
    if let Err(err) = copy_durable(source, &partial) {
        let _ = fs::remove_file(&partial);
        return Err(err);
    }
    if let Err(err) = fs::rename(&partial, destination) {
        let _ = fs::remove_file(&partial);
        return Err(io_err(destination, err));
    }
    release_archived_source(source, fs::remove_file(source))
}

/// The archive is already in place; an undeletable source is emptied instead
/// so the next rollover attempt does not dump the same content twice.
fn release_archived_source(source: &Path, removed: io::Result<()>) -> Result<(), DaemonError> {
    let err = match removed {
        Ok(()) => return Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => err,
    };
    tracing::warn!(
        source = %source.display(),
        error = %err,
        "archived source could not be removed, truncating it in place",
    );
    OpenOptions::new()
        .write(true)
        .open(source)
        .and_then(|file| file.set_len(0))
        .map_err(|_| io_err(source, err))
}

fn copy_durable(source: &Path, destination: &Path) -> Result<(), DaemonError> {
    let mut from = File::open(source).map_err(|e| io_err(source, e))?;
    let mut to = File::create(destination).map_err(|e| io_err(destination, e))?;
    io::copy(&mut from, &mut to).map_err(|e| io_err(destination, e))?;
    to.sync_all().map_err(|e| io_err(destination, e))?;

    if let Ok(meta) = from.metadata() {
        let mtime = FileTime::from_last_modification_time(&meta);
        let _ = filetime::set_file_mtime(destination, mtime);
    }
    Ok(())
}
