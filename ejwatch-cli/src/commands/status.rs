//! `ejwatch status`: what the watcher would do on its next tick.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use ejwatch_core::{CalendarDay, Settings};
use ejwatch_daemon::{detector, rotation, Clock, RolloverStateStore, SystemClock, Transition};

use super::{ConfigArg, Identity};

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.config.load()?;
        let report = build_report(&settings, SystemClock.today())?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render status JSON")?
            );
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    terminal: Option<String>,
    ip: Option<String>,
    source: String,
    source_present: bool,
    source_bytes: Option<u64>,
    source_modified: Option<String>,
    state_file: String,
    last_known_day: Option<CalendarDay>,
    state_error: Option<String>,
    today: CalendarDay,
    rollover_pending: bool,
    destination: Option<String>,
    dump_directory: String,
    rotation_mode: String,
    tick_interval_secs: u64,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn build_report(settings: &Settings, today: CalendarDay) -> Result<StatusReport> {
    let target = settings.watch_target();

    let (terminal, ip) = match Identity::from_settings(settings) {
        Ok(identity) => (
            identity.terminal_id(),
            identity.address().map(|ip| ip.to_string()),
        ),
        Err(_) => (None, None),
    };

    let fingerprint = detector::snapshot(&target.source_path)
        .with_context(|| format!("cannot stat {}", target.source_path.display()))?;

    let store = RolloverStateStore::new(&settings.state_file);
    let (last_known_day, state_error) = match store.read() {
        Ok(day) => (day, None),
        Err(err) => (None, Some(err.to_string())),
    };
    let effective_day = store.load(today);
    let rollover_pending = matches!(
        rotation::evaluate(today, effective_day),
        Transition::RolledOver { .. }
    );

    Ok(StatusReport {
        destination: terminal
            .as_ref()
            .map(|id| target.destination_for(today, id).display().to_string()),
        terminal: terminal.map(|id| id.to_string()),
        ip,
        source: target.source_path.display().to_string(),
        source_present: fingerprint.is_some(),
        source_bytes: fingerprint.map(|fp| fp.size),
        source_modified: fingerprint
            .map(|fp| DateTime::<Local>::from(fp.modified_at).to_rfc3339()),
        state_file: settings.state_file.display().to_string(),
        last_known_day,
        state_error,
        today,
        rollover_pending,
        dump_directory: target.dump_directory.display().to_string(),
        rotation_mode: settings.rotation_mode.to_string(),
        tick_interval_secs: settings.tick_interval.as_secs(),
    })
}

fn print_table(report: &StatusReport) {
    let missing = || "unknown".yellow().to_string();

    let source = if report.source_present {
        format!(
            "{} ({} bytes)",
            report.source,
            report.source_bytes.unwrap_or_default()
        )
    } else {
        format!("{} {}", report.source, "(missing)".red())
    };
    let last_day = match (&report.last_known_day, &report.state_error) {
        (Some(day), _) => day.to_string(),
        (None, Some(err)) => format!("{} {err}", "corrupt:".red()),
        (None, None) => "none yet".dimmed().to_string(),
    };
    let rollover = if report.rollover_pending {
        "pending".yellow().to_string()
    } else {
        "no".green().to_string()
    };

    let rows = vec![
        StatusRow {
            field: "terminal",
            value: report.terminal.clone().unwrap_or_else(missing),
        },
        StatusRow {
            field: "ip",
            value: report.ip.clone().unwrap_or_else(|| "-".to_string()),
        },
        StatusRow {
            field: "source",
            value: source,
        },
        StatusRow {
            field: "last known day",
            value: last_day,
        },
        StatusRow {
            field: "today",
            value: report.today.to_string(),
        },
        StatusRow {
            field: "rollover",
            value: rollover,
        },
        StatusRow {
            field: "destination",
            value: report.destination.clone().unwrap_or_else(missing),
        },
        StatusRow {
            field: "dump directory",
            value: report.dump_directory.clone(),
        },
        StatusRow {
            field: "rotation mode",
            value: report.rotation_mode.clone(),
        },
        StatusRow {
            field: "tick interval",
            value: format!("{}s", report.tick_interval_secs),
        },
    ];

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
