pub mod convert;
pub mod resolve;
pub mod run;
pub mod simulate;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ejwatch_core::{
    config::DEFAULT_SETTINGS_FILE, IdentityResolver, Settings, StaticResolver, TableResolver,
    TerminalId, TerminalTable, UdpRouteProbe,
};

/// `--config` flag shared by every command that reads settings.
#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Path to the settings file.
    #[arg(long, short = 'c', default_value = DEFAULT_SETTINGS_FILE)]
    pub config: PathBuf,
}

impl ConfigArg {
    pub fn load(&self) -> Result<Settings> {
        Settings::load_at(&self.config)
            .with_context(|| format!("cannot load settings from {}", self.config.display()))
    }
}

/// How this host's terminal id is determined.
pub enum Identity {
    Static(StaticResolver),
    Table(TableResolver<UdpRouteProbe>),
}

impl Identity {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if let Some(id) = settings.terminal_id.clone() {
            return Ok(Self::Static(StaticResolver(id)));
        }
        let path = settings
            .terminal_table
            .as_ref()
            .context("no terminal table configured")?;
        let table = TerminalTable::load_at(path)
            .with_context(|| format!("cannot load terminal table {}", path.display()))?;
        Ok(Self::Table(TableResolver::new(UdpRouteProbe::default(), table)))
    }

    /// Address the terminal id is keyed by, when a table is in use.
    pub fn address(&self) -> Option<std::net::IpAddr> {
        match self {
            Self::Static(_) => None,
            Self::Table(resolver) => resolver.address(),
        }
    }

    pub fn terminal_id(&self) -> Option<TerminalId> {
        match self {
            Self::Static(resolver) => resolver.resolve_terminal_id(),
            Self::Table(resolver) => resolver.resolve_terminal_id(),
        }
    }

    /// Resolve or fail with the address that had no match.
    pub fn require_terminal_id(&self) -> Result<TerminalId> {
        self.terminal_id().with_context(|| match self.address() {
            Some(ip) => format!("no terminal id found for IP {ip}"),
            None => "unable to determine this host's IP address".to_string(),
        })
    }
}
