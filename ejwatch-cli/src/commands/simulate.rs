//! `ejwatch simulate`: stand-in for the ATM writing its journal.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use rand::seq::IndexedRandom;

/// Pauses between entries, in milliseconds.
const INTERVALS_MS: &[u64] = &[500, 700, 1000, 2000, 3000];

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Journal file to append to.
    #[arg(long)]
    pub path: PathBuf,

    /// Stop after this many seconds.
    #[arg(long, default_value_t = 180)]
    pub duration_secs: u64,

    /// Stop after this many entries.
    #[arg(long)]
    pub max_entries: Option<u64>,
}

impl SimulateArgs {
    pub fn run(self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }

        let started = Instant::now();
        let duration = Duration::from_secs(self.duration_secs);
        let mut rng = rand::rng();
        let mut entry: u64 = 1;
        let mut written: u64 = 0;

        while started.elapsed() < duration {
            let line = journal_line(entry);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .with_context(|| format!("open {}", self.path.display()))?;
            file.write_all(line.as_bytes())
                .with_context(|| format!("append to {}", self.path.display()))?;
            written += 1;
            print!("wrote: {line}");

            if self.max_entries.is_some_and(|max| entry >= max) {
                break;
            }
            let pause = INTERVALS_MS.choose(&mut rng).copied().unwrap_or(1000);
            sleep(Duration::from_millis(pause));
            entry += 1;
        }

        println!("finished writing {written} entries");
        Ok(())
    }
}

fn journal_line(entry: u64) -> String {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
    format!("-{entry}- {now} - Sample log entry-{entry} \n")
}
