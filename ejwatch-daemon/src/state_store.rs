//! Rollover state store: the last calendar day the watcher rolled over to.
//!
//! Persists a single line `YYYY_MM_DD` at the configured state path.
//! Writes use the atomic `.tmp` + rename pattern so a crash mid-write never
//! leaves a truncated record behind.

use std::path::{Path, PathBuf};

use ejwatch_core::CalendarDay;

use crate::error::{io_err, DaemonError};

/// Reads and writes the persisted `last_known_day`.
///
/// Holds no cached value: every `load` goes to disk, so two stores pointed at
/// the same path behave like a process restart.
#[derive(Debug, Clone)]
pub struct RolloverStateStore {
    path: PathBuf,
}

impl RolloverStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict read: `Ok(None)` when no record exists, an error when the
    /// record cannot be read or does not parse.
    pub fn read(&self) -> Result<Option<CalendarDay>, DaemonError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&self.path, err)),
        };
        let line = contents.lines().next().unwrap_or_default();
        line.parse::<CalendarDay>()
            .map(Some)
            .map_err(|err| DaemonError::CorruptState {
                path: self.path.clone(),
                detail: err.to_string(),
            })
    }

    /// Lenient read used by the monitor: a missing or unreadable record
    /// degrades to `fallback_today`.
    pub fn load(&self, fallback_today: CalendarDay) -> CalendarDay {
        match self.read() {
            Ok(Some(day)) => day,
            Ok(None) => fallback_today,
            Err(err) => {
                tracing::warn!(error = %err, fallback = %fallback_today, "ignoring rollover state");
                fallback_today
            }
        }
    }

    /// Overwrite the record atomically.
    ///
    /// Writes to `<path>.tmp` then renames to `<path>`.
    pub fn save(&self, day: CalendarDay) -> Result<(), DaemonError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }

        let tmp = self.tmp_path();
        std::fs::write(&tmp, format!("{day}\n")).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!("{name}.tmp"))
    }
}
