//! `ejwatch resolve`: show which terminal this host is.

use anyhow::Result;
use clap::Args;

use super::{ConfigArg, Identity};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

impl ResolveArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.config.load()?;
        let identity = Identity::from_settings(&settings)?;

        match (&identity, identity.address()) {
            (Identity::Static(_), _) => println!("ip: (not probed, terminal_id is configured)"),
            (Identity::Table(_), Some(ip)) => println!("ip: {ip}"),
            (Identity::Table(_), None) => println!("ip: unknown"),
        }
        let terminal = identity.require_terminal_id()?;
        println!("terminal: {terminal}");
        Ok(())
    }
}
