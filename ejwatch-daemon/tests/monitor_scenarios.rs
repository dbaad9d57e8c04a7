//! End-to-end monitor scenarios driven by a manual clock.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use ejwatch_core::{CalendarDay, RotationMode, TerminalId, WatchTarget};
use ejwatch_daemon::{
    monitor, ManualClock, MemorySink, Monitor, MonitorEvent, RolloverStateStore,
};
use tempfile::TempDir;
use tokio::sync::broadcast;

struct Harness {
    _root: TempDir,
    target: WatchTarget,
    state: PathBuf,
    clock: ManualClock,
    sink: MemorySink,
}

impl Harness {
    fn new(start: NaiveDateTime) -> Self {
        let root = TempDir::new().expect("tempdir");
        let source_dir = root.path().join("coreEJ");
        fs::create_dir_all(&source_dir).expect("mkdir source dir");
        let target = WatchTarget::new(
            source_dir.join("EJDATA.LOG"),
            root.path().join("dest"),
            Some(root.path().join("EJ_dump")),
        );
        let state = root.path().join("ejwatch_state.txt");
        Self {
            _root: root,
            target,
            state,
            clock: ManualClock::new(start),
            sink: MemorySink::new(),
        }
    }

    fn monitor(&self) -> Monitor {
        Monitor::new(
            self.target.clone(),
            TerminalId::new("T42").expect("terminal id"),
            RolloverStateStore::new(&self.state),
            Arc::new(self.clock.clone()),
            Arc::new(self.sink.clone()),
            RotationMode::Archive,
        )
    }

    fn append(&self, bytes: &[u8]) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.target.source_path)
            .expect("open source");
        file.write_all(bytes).expect("append");
    }

    fn dest(&self, day: &str) -> PathBuf {
        self.target
            .destination_directory
            .join(format!("{day}_T42.log"))
    }

    fn dumps(&self) -> Vec<PathBuf> {
        list(&self.target.dump_directory)
    }

    fn state(&self) -> String {
        fs::read_to_string(&self.state).expect("read state")
    }
}

fn list(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return vec![];
    };
    let mut paths: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();
    paths
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .expect("date")
        .and_hms_opt(h, 0, 0)
        .expect("time")
}

#[test]
fn journal_is_copied_then_rolled_over_at_midnight() {
    let h = Harness::new(at(2024, 5, 1, 10));
    fs::write(&h.target.source_path, b"").expect("create empty source");
    let mut m = h.monitor();

    h.append(b"0123456789");
    assert!(m.tick().copied);
    assert_eq!(m.destination(), h.dest("2024_05_01"));
    assert_eq!(fs::read(h.dest("2024_05_01")).expect("dest"), b"0123456789");

    h.clock.set(at(2024, 5, 2, 0));
    let report = m.tick();
    assert!(report.rolled_over);
    assert_eq!(h.state(), "2024_05_02\n");

    let dumps = h.dumps();
    assert_eq!(dumps.len(), 1, "prior source archived exactly once");
    assert_eq!(fs::read(&dumps[0]).expect("dump"), b"0123456789");
    assert_eq!(fs::metadata(&h.target.source_path).expect("source").len(), 0);

    h.append(b"new day");
    assert!(m.tick().copied);
    assert_eq!(fs::read(h.dest("2024_05_02")).expect("dest"), b"new day");
    assert_eq!(
        fs::read(h.dest("2024_05_01")).expect("old dest"),
        b"0123456789",
        "yesterday's destination is left as it was"
    );
}

#[test]
fn rollover_is_idempotent_per_day() {
    let h = Harness::new(at(2024, 5, 1, 23));
    h.append(b"day one");
    let mut m = h.monitor();
    m.tick();

    h.clock.set(at(2024, 5, 2, 0));
    assert!(m.tick().rolled_over);
    h.append(b"x");
    assert!(!m.tick().rolled_over);
    assert!(!m.tick().rolled_over);

    assert_eq!(h.dumps().len(), 1);
    let rollovers = h
        .sink
        .events()
        .iter()
        .filter(|e| matches!(e, MonitorEvent::RolledOver { .. }))
        .count();
    assert_eq!(rollovers, 1);
}

#[test]
fn multi_day_gap_collapses_into_one_rollover() {
    let h = Harness::new(at(2024, 5, 1, 12));
    h.append(b"day one");
    let mut m = h.monitor();
    m.tick();

    h.clock.set(at(2024, 5, 4, 8));
    assert!(m.tick().rolled_over);
    assert_eq!(m.last_known_day(), CalendarDay::from_ymd(2024, 5, 4).expect("day"));

    assert!(h.dest("2024_05_04").exists());
    assert!(!h.dest("2024_05_02").exists());
    assert!(!h.dest("2024_05_03").exists());
    assert_eq!(h.dumps().len(), 1);
    assert!(h.sink.events().iter().any(|e| matches!(
        e,
        MonitorEvent::RolledOver {
            skipped_days: 2,
            ..
        }
    )));
}

#[test]
fn restart_across_midnight_still_rolls_over() {
    let h = Harness::new(at(2024, 5, 1, 22));
    h.append(b"before outage");
    {
        let mut first = h.monitor();
        first.tick();
    }
    assert_eq!(h.state(), "2024_05_01\n");

    h.clock.set(at(2024, 5, 2, 7));
    let mut restarted = h.monitor();
    assert_eq!(
        restarted.last_known_day(),
        CalendarDay::from_ymd(2024, 5, 1).expect("day")
    );
    assert!(restarted.tick().rolled_over);
    assert_eq!(h.state(), "2024_05_02\n");
    assert_eq!(fs::read(&h.dumps()[0]).expect("dump"), b"before outage");
}

#[test]
fn absent_source_is_logged_then_copied_when_it_appears() {
    let h = Harness::new(at(2024, 5, 1, 10));
    let mut m = h.monitor();

    let report = m.tick();
    assert!(report.source_missing);
    assert_eq!(report.errors, 0);
    assert!(h
        .sink
        .events()
        .iter()
        .any(|e| matches!(e, MonitorEvent::SourceMissing { .. })));

    assert!(m.tick().source_missing, "absence is retried every tick");

    h.append(b"late start");
    assert!(m.tick().copied);
    assert_eq!(fs::read(h.dest("2024_05_01")).expect("dest"), b"late start");
}

#[tokio::test]
async fn run_copies_until_shutdown() {
    let h = Harness::new(at(2024, 5, 1, 10));
    h.append(b"live");
    let m = h.monitor();

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let handle = tokio::spawn(monitor::run(m, Duration::from_millis(20), shutdown_rx));

    let dest = h.dest("2024_05_01");
    let mut copied = false;
    for _ in 0..100 {
        if fs::read(&dest).map(|b| b == b"live").unwrap_or(false) {
            copied = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(copied, "monitor did not copy the journal in time");

    shutdown_tx.send(()).expect("send shutdown");
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("monitor stopped in time")
        .expect("join");
    assert!(result.is_ok());
    assert_eq!(h.sink.events().last(), Some(&MonitorEvent::Stopped));
}
