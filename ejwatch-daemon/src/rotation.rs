//! Date-based rotation policy.
//!
//! Evaluated once per tick from `(today, last_known_day)`:
//! - `SameDay`: nothing structural happens.
//! - `RolledOver`: the source is archived (or discarded) and recreated empty;
//!   the monitor then moves to the new destination, persists the day and
//!   drops its fingerprint baseline.
//!
//! Downtime spanning several midnights collapses into a single rollover to
//! today. The intermediate days never get a destination file; the skipped
//! count is reported so the gap shows up in the log.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use ejwatch_core::{CalendarDay, RotationMode, WatchTarget};

use crate::archiver;
use crate::error::{io_err, DaemonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SameDay,
    RolledOver {
        from: CalendarDay,
        to: CalendarDay,
        /// Days strictly between `from` and `to`.
        skipped_days: i64,
    },
}

/// Decide whether the day has rolled over since `last_known_day`.
///
/// Any difference counts, including a clock that went backwards.
pub fn evaluate(today: CalendarDay, last_known_day: CalendarDay) -> Transition {
    if today == last_known_day {
        return Transition::SameDay;
    }
    Transition::RolledOver {
        from: last_known_day,
        to: today,
        skipped_days: (today.days_since(last_known_day) - 1).max(0),
    }
}

/// What happened to the old source during a rollover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    Archived(PathBuf),
    Discarded,
    /// There was no source file to clear.
    Absent,
}

/// Clears the source file at rollover according to the configured mode.
#[derive(Debug, Clone)]
pub struct Rotator {
    mode: RotationMode,
    source: PathBuf,
    dump_directory: PathBuf,
}

impl Rotator {
    pub fn new(mode: RotationMode, target: &WatchTarget) -> Self {
        Self {
            mode,
            source: target.source_path.clone(),
            dump_directory: target.dump_directory.clone(),
        }
    }

    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    /// Archive or discard the source, then make sure the path exists again so
    /// the upstream writer keeps appending to it.
    pub fn clear_source(&self, now: NaiveDateTime) -> Result<ClearOutcome, DaemonError> {
        let outcome = match self.mode {
            RotationMode::Archive => {
                match archiver::archive(&self.source, &self.dump_directory, now)? {
                    Some(archived) => ClearOutcome::Archived(archived),
                    None => ClearOutcome::Absent,
                }
            }
            RotationMode::Discard => match fs::remove_file(&self.source) {
                Ok(()) => ClearOutcome::Discarded,
                Err(err) if err.kind() == io::ErrorKind::NotFound => ClearOutcome::Absent,
                Err(err) => return Err(io_err(&self.source, err)),
            },
        };
        ensure_source(&self.source)?;
        Ok(outcome)
    }
}

/// Create `path` empty if it is absent. A file the writer already recreated
/// holds new-day entries and is left untouched.
fn ensure_source(path: &Path) -> Result<(), DaemonError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| io_err(path, e))
}
