//! Semantic monitor events and the sinks that record them.
//!
//! The monitor never formats log lines itself; it emits [`MonitorEvent`]s
//! into an [`EventSink`]. Production uses [`TracingSink`]; tests use
//! [`MemorySink`] to assert on the timeline.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ejwatch_core::{CalendarDay, RotationMode, TerminalId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Started {
        terminal: TerminalId,
        source: PathBuf,
        destination: PathBuf,
        last_known_day: CalendarDay,
    },
    /// No usable rollover record; monitoring starts from `day`.
    StateReset {
        day: CalendarDay,
        error: Option<String>,
    },
    /// The day changed; `skipped_days` intermediate days got no destination file.
    RolledOver {
        from: CalendarDay,
        to: CalendarDay,
        skipped_days: i64,
        destination: PathBuf,
    },
    RolloverFailed {
        to: CalendarDay,
        mode: RotationMode,
        error: String,
    },
    SourceArchived {
        source: PathBuf,
        archived: PathBuf,
    },
    SourceDiscarded {
        source: PathBuf,
    },
    SourceMissing {
        source: PathBuf,
    },
    Copied {
        destination: PathBuf,
        bytes: u64,
    },
    CopyFailed {
        destination: PathBuf,
        error: String,
    },
    StatFailed {
        source: PathBuf,
        error: String,
    },
    StateSaveFailed {
        day: CalendarDay,
        error: String,
    },
    Stopped,
}

/// Receives monitor events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MonitorEvent);
}

/// Renders events as structured `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: MonitorEvent) {
        match event {
            MonitorEvent::Started {
                terminal,
                source,
                destination,
                last_known_day,
            } => tracing::info!(
                terminal = %terminal,
                source = %source.display(),
                destination = %destination.display(),
                last_known_day = %last_known_day,
                "monitoring started",
            ),
            MonitorEvent::StateReset { day, error } => match error {
                Some(error) => tracing::warn!(
                    day = %day,
                    error = %error,
                    "rollover state unreadable, starting from today",
                ),
                None => tracing::info!(day = %day, "no rollover state yet, starting from today"),
            },
            MonitorEvent::RolledOver {
                from,
                to,
                skipped_days,
                destination,
            } => {
                if skipped_days > 0 {
                    tracing::warn!(
                        from = %from,
                        to = %to,
                        skipped_days,
                        "downtime spanned several days; intermediate days have no journal copy",
                    );
                }
                tracing::info!(
                    from = %from,
                    to = %to,
                    destination = %destination.display(),
                    "day rolled over",
                );
            }
            MonitorEvent::RolloverFailed { to, mode, error } => tracing::error!(
                to = %to,
                mode = %mode,
                error = %error,
                "rollover failed; retrying next tick",
            ),
            MonitorEvent::SourceArchived { source, archived } => tracing::info!(
                source = %source.display(),
                archived = %archived.display(),
                "source archived",
            ),
            MonitorEvent::SourceDiscarded { source } => {
                tracing::info!(source = %source.display(), "source discarded")
            }
            MonitorEvent::SourceMissing { source } => {
                tracing::warn!(source = %source.display(), "source file does not exist")
            }
            MonitorEvent::Copied { destination, bytes } => tracing::info!(
                destination = %destination.display(),
                bytes,
                "change detected, journal copied",
            ),
            MonitorEvent::CopyFailed { destination, error } => tracing::error!(
                destination = %destination.display(),
                error = %error,
                "journal copy failed",
            ),
            MonitorEvent::StatFailed { source, error } => tracing::error!(
                source = %source.display(),
                error = %error,
                "cannot stat source",
            ),
            MonitorEvent::StateSaveFailed { day, error } => tracing::warn!(
                day = %day,
                error = %error,
                "could not persist rollover state",
            ),
            MonitorEvent::Stopped => tracing::info!("monitoring stopped"),
        }
    }
}

/// Keeps every event in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<MonitorEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: MonitorEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clones_share_one_log() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        handle.emit(MonitorEvent::Stopped);

        assert_eq!(sink.events(), vec![MonitorEvent::Stopped]);
        assert_eq!(handle.events(), sink.events());
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let day = CalendarDay::from_ymd(2024, 5, 2).unwrap();
        TracingSink.emit(MonitorEvent::RolledOver {
            from: CalendarDay::from_ymd(2024, 4, 29).unwrap(),
            to: day,
            skipped_days: 2,
            destination: PathBuf::from("CopyEJ/2024_05_02_T42.log"),
        });
        TracingSink.emit(MonitorEvent::StateReset { day, error: None });
    }
}
