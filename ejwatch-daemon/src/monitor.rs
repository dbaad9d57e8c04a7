//! The monitor loop: rollover first, then change detection and copy.
//!
//! [`Monitor::tick`] is one synchronous, deterministic step; [`run`] drives it
//! on a fixed interval until shutdown. Nothing that happens inside a tick can
//! end the loop: every failure becomes a [`MonitorEvent`] and is retried on
//! the next tick.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use filetime::FileTime;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use ejwatch_core::{CalendarDay, RotationMode, TerminalId, WatchTarget};

use crate::clock::Clock;
use crate::detector::{self, FileFingerprint};
use crate::error::{io_err, DaemonError};
use crate::events::{EventSink, MonitorEvent};
use crate::paths::partial_path;
use crate::rotation::{self, ClearOutcome, Rotator, Transition};
use crate::state_store::RolloverStateStore;

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub rolled_over: bool,
    pub rollover_failed: bool,
    pub source_missing: bool,
    pub copied: bool,
    pub errors: usize,
}

/// Owns all loop state: the active destination, the persisted day, and the
/// fingerprint baseline.
pub struct Monitor {
    target: WatchTarget,
    terminal: TerminalId,
    store: RolloverStateStore,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    rotator: Rotator,
    last_known_day: CalendarDay,
    /// Day whose record could not be written yet; retried every tick.
    unsaved_day: Option<CalendarDay>,
    destination: PathBuf,
    baseline: Option<FileFingerprint>,
}

impl Monitor {
    /// Build the loop state from the persisted rollover record.
    ///
    /// With no usable record the monitor starts from today and writes that
    /// immediately, so a restart after midnight still sees the rollover.
    pub fn new(
        target: WatchTarget,
        terminal: TerminalId,
        store: RolloverStateStore,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        mode: RotationMode,
    ) -> Self {
        let today = clock.today();
        let (recorded, unreadable) = match store.read() {
            Ok(day) => (day, None),
            Err(err) => (None, Some(err.to_string())),
        };
        let last_known_day = recorded.unwrap_or(today);
        let destination = target.destination_for(last_known_day, &terminal);
        let rotator = Rotator::new(mode, &target);

        let mut monitor = Self {
            target,
            terminal,
            store,
            clock,
            sink,
            rotator,
            last_known_day,
            unsaved_day: None,
            destination,
            baseline: None,
        };

        if recorded.is_none() {
            monitor.sink.emit(MonitorEvent::StateReset {
                day: today,
                error: unreadable,
            });
            monitor.persist(today);
        }
        monitor.sink.emit(MonitorEvent::Started {
            terminal: monitor.terminal.clone(),
            source: monitor.target.source_path.clone(),
            destination: monitor.destination.clone(),
            last_known_day: monitor.last_known_day,
        });
        monitor
    }

    /// The destination currently being written.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn last_known_day(&self) -> CalendarDay {
        self.last_known_day
    }

    pub fn baseline(&self) -> Option<&FileFingerprint> {
        self.baseline.as_ref()
    }

    /// Run one tick: rollover evaluation happens-before change detection.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let now = self.clock.now();
        let today = CalendarDay::new(now.date());

        if let Some(day) = self.unsaved_day {
            if !self.persist(day) {
                report.errors += 1;
            }
        }

        if let Transition::RolledOver {
            from,
            to,
            skipped_days,
        } = rotation::evaluate(today, self.last_known_day)
        {
            match self.rotator.clear_source(now) {
                Ok(outcome) => {
                    self.emit_clear(outcome);
                    if !self.commit_rollover(from, to, skipped_days) {
                        report.errors += 1;
                    }
                    report.rolled_over = true;
                }
                Err(err) => {
                    // Not committed: the copy below would put yesterday's
                    // content into today's file.
                    self.sink.emit(MonitorEvent::RolloverFailed {
                        to,
                        mode: self.rotator.mode(),
                        error: err.to_string(),
                    });
                    report.rollover_failed = true;
                    report.errors += 1;
                    return report;
                }
            }
        }

        let source = self.target.source_path.clone();
        let current = match detector::snapshot(&source) {
            Ok(Some(fingerprint)) => fingerprint,
            Ok(None) => {
                self.sink.emit(MonitorEvent::SourceMissing { source });
                report.source_missing = true;
                return report;
            }
            Err(err) => {
                self.sink.emit(MonitorEvent::StatFailed {
                    source,
                    error: err.to_string(),
                });
                report.errors += 1;
                return report;
            }
        };

        if !detector::has_changed(self.baseline.as_ref(), &current) {
            return report;
        }

        match copy_to_destination(&source, &self.destination) {
            Ok(bytes) => {
                self.baseline = Some(current);
                self.sink.emit(MonitorEvent::Copied {
                    destination: self.destination.clone(),
                    bytes,
                });
                report.copied = true;
            }
            Err(err) => {
                self.sink.emit(MonitorEvent::CopyFailed {
                    destination: self.destination.clone(),
                    error: err.to_string(),
                });
                report.errors += 1;
            }
        }
        report
    }

    fn emit_clear(&self, outcome: ClearOutcome) {
        let source = self.target.source_path.clone();
        match outcome {
            ClearOutcome::Archived(archived) => {
                self.sink
                    .emit(MonitorEvent::SourceArchived { source, archived })
            }
            ClearOutcome::Discarded => self.sink.emit(MonitorEvent::SourceDiscarded { source }),
            ClearOutcome::Absent => {}
        }
    }

    /// Returns whether the new day reached the state file.
    fn commit_rollover(&mut self, from: CalendarDay, to: CalendarDay, skipped_days: i64) -> bool {
        self.destination = self.target.destination_for(to, &self.terminal);
        let saved = self.persist(to);
        self.last_known_day = to;
        self.baseline = None;
        self.sink.emit(MonitorEvent::RolledOver {
            from,
            to,
            skipped_days,
            destination: self.destination.clone(),
        });
        saved
    }

    /// Write `day` to the store. On failure the day stays pending and the
    /// next tick writes it again, so a restart never repeats a rollover.
    fn persist(&mut self, day: CalendarDay) -> bool {
        match self.store.save(day) {
            Ok(()) => {
                self.unsaved_day = None;
                true
            }
            Err(err) => {
                self.unsaved_day = Some(day);
                self.sink.emit(MonitorEvent::StateSaveFailed {
                    day,
                    error: err.to_string(),
                });
                false
            }
        }
    }
}

/// Replace `destination` with the full current content of `source`.
///
/// The copy lands in a sibling partial file first, so the destination is
/// never observed truncated. The source's modification time is carried over.
pub fn copy_to_destination(source: &Path, destination: &Path) -> Result<u64, DaemonError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let partial = partial_path(destination);
    let bytes = match fs::copy(source, &partial) {
        Ok(bytes) => bytes,
        Err(err) => {
            let _ = fs::remove_file(&partial);
            return Err(io_err(source, err));
        }
    };

    if let Ok(meta) = fs::metadata(source) {
        let _ = filetime::set_file_mtime(&partial, FileTime::from_last_modification_time(&meta));
    }

    if let Err(err) = fs::rename(&partial, destination) {
        let _ = fs::remove_file(&partial);
        return Err(io_err(destination, err));
    }
    Ok(bytes)
}

/// Drive `monitor` every `tick_interval` until `shutdown` fires.
///
/// A tick in flight when shutdown arrives runs to completion first.
pub async fn run(
    mut monitor: Monitor,
    tick_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                let (returned, report) = tokio::task::spawn_blocking(move || {
                    let report = monitor.tick();
                    (monitor, report)
                })
                .await
                .map_err(|err| DaemonError::Join {
                    task: "monitor tick",
                    detail: err.to_string(),
                })?;
                monitor = returned;
                tracing::trace!(?report, "tick finished");
            }
        }
    }

    monitor.sink.emit(MonitorEvent::Stopped);
    Ok(())
}
