//! Size-based rotation for the watcher's own service log.
//!
//! Runs once at startup, before the subscriber opens the file. Past
//! [`MAX_LOG_BYTES`] the log is shifted down a numbered chain:
//!   monitoring.log → monitoring.log.1 → … → monitoring.log.5 (dropped)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Service log size that triggers rotation (10 MiB).
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Numbered backups kept next to the live log.
pub const MAX_BACKUPS: usize = 5;

/// Shift `log_path` into the backup chain when it has reached `max_bytes`.
///
/// Returns whether a rotation happened. A missing log is not an error.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, backups: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes || backups == 0 {
        return Ok(false);
    }

    match fs::remove_file(backup_path(log_path, backups)) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    for n in (1..backups).rev() {
        let from = backup_path(log_path, n);
        if from.exists() {
            fs::rename(&from, backup_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, backup_path(log_path, 1))?;
    Ok(true)
}

/// Rotate the service log with the default limits.
pub fn rotate_service_log(log_path: &Path) -> io::Result<bool> {
    rotate_if_needed(log_path, MAX_LOG_BYTES, MAX_BACKUPS)
}

/// `<log>.<n>`
fn backup_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "monitoring.log".to_owned());
    base.with_file_name(format!("{name}.{n}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SMALL_LIMIT: u64 = 64;

    #[test]
    fn small_log_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("monitoring.log");
        fs::write(&log, b"short").unwrap();
        assert!(!rotate_if_needed(&log, SMALL_LIMIT, MAX_BACKUPS).unwrap());
        assert!(!backup_path(&log, 1).exists());
    }

    #[test]
    fn missing_log_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!rotate_service_log(&dir.path().join("monitoring.log")).unwrap());
    }

    #[test]
    fn oversized_log_moves_to_first_backup() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("monitoring.log");
        fs::write(&log, vec![b'x'; SMALL_LIMIT as usize]).unwrap();

        assert!(rotate_if_needed(&log, SMALL_LIMIT, MAX_BACKUPS).unwrap());
        assert!(!log.exists(), "live log is reopened by the subscriber");
        assert_eq!(
            fs::metadata(backup_path(&log, 1)).unwrap().len(),
            SMALL_LIMIT
        );
    }

    #[test]
    fn backup_chain_is_capped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("monitoring.log");
        for n in 1..=MAX_BACKUPS {
            fs::write(backup_path(&log, n), format!("backup-{n}")).unwrap();
        }
        fs::write(&log, vec![b'x'; SMALL_LIMIT as usize]).unwrap();

        assert!(rotate_if_needed(&log, SMALL_LIMIT, MAX_BACKUPS).unwrap());
        assert_eq!(
            fs::read_to_string(backup_path(&log, MAX_BACKUPS)).unwrap(),
            format!("backup-{}", MAX_BACKUPS - 1)
        );
        assert!(!backup_path(&log, MAX_BACKUPS + 1).exists());
    }
}
