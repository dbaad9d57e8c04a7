//! `ejwatch run`: resolve identity and watch the journal until stopped.

use anyhow::{Context, Result};
use clap::Args;

use ejwatch_daemon::{start_blocking, RunOptions};

use super::{ConfigArg, Identity};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.config.load()?;
        let identity = Identity::from_settings(&settings)?;
        let terminal = identity.require_terminal_id()?;

        start_blocking(RunOptions::from_settings(&settings, terminal))
            .context("watcher exited with error")
    }
}
