//! Terminal identity: which ATM is this host?
//!
//! The answer is composed from two collaborators:
//! - an [`AddressProbe`] that reports the host's primary IP address, and
//! - a [`TerminalTable`] mapping addresses to terminal ids, loaded from the
//!   CSV (`ip,terminal_id` with a header row) or JSON (`{"ip": "id"}`) file
//!   shipped with each deployment.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::path::Path;

use crate::error::{io_err, ConfigError};
use crate::types::TerminalId;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Reports the address used to key the terminal table.
pub trait AddressProbe {
    fn resolve(&self) -> Option<IpAddr>;
}

/// Resolves the terminal id for this host.
pub trait IdentityResolver {
    fn resolve_terminal_id(&self) -> Option<TerminalId>;
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

/// Finds the primary outbound IPv4 address by "connecting" a UDP socket to a
/// public address and reading back the local end. No packet is sent.
#[derive(Debug, Clone)]
pub struct UdpRouteProbe {
    remote: SocketAddr,
}

impl UdpRouteProbe {
    pub const DEFAULT_REMOTE: SocketAddr =
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

    pub fn new(remote: SocketAddr) -> Self {
        Self { remote }
    }
}

impl Default for UdpRouteProbe {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REMOTE)
    }
}

impl AddressProbe for UdpRouteProbe {
    fn resolve(&self) -> Option<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
        socket.connect(self.remote).ok()?;
        let ip = socket.local_addr().ok()?.ip();
        (!ip.is_unspecified()).then_some(ip)
    }
}

/// Always reports the same address. Useful for tests and for hosts where the
/// address is pinned in configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedAddress(pub Option<IpAddr>);

impl AddressProbe for FixedAddress {
    fn resolve(&self) -> Option<IpAddr> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Terminal table
// ---------------------------------------------------------------------------

/// Address → terminal id lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalTable {
    entries: BTreeMap<String, TerminalId>,
}

impl TerminalTable {
    /// Load a table, choosing the format from the file extension.
    ///
    /// An empty table is an error: the watcher cannot start without one.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let table = match ext.as_deref() {
            Some("csv") => Self::load_csv(path)?,
            Some("json") => Self::load_json(path)?,
            _ => {
                return Err(ConfigError::UnsupportedTable {
                    path: path.to_path_buf(),
                })
            }
        };
        if table.is_empty() {
            return Err(ConfigError::EmptyTable {
                path: path.to_path_buf(),
            });
        }
        Ok(table)
    }

    /// Read `ip,terminal_id` rows. The first row is a header. Rows that do not
    /// have exactly two columns, or whose id is blank, are skipped.
    pub fn load_csv(path: &Path) -> Result<Self, ConfigError> {
        let csv_err = |source| ConfigError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;

        let mut table = Self::default();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            if record.len() != 2 {
                continue;
            }
            if let Ok(id) = TerminalId::new(&record[1]) {
                table.insert(&record[0], id);
            }
        }
        Ok(table)
    }

    /// Read a JSON object of `"ip": "terminal_id"` pairs.
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let raw: BTreeMap<String, String> =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let mut table = Self::default();
        for (ip, id) in raw {
            if let Ok(id) = TerminalId::new(id) {
                table.insert(&ip, id);
            }
        }
        Ok(table)
    }

    pub fn insert(&mut self, ip: &str, id: TerminalId) {
        self.entries.insert(ip.trim().to_owned(), id);
    }

    pub fn lookup(&self, ip: IpAddr) -> Option<&TerminalId> {
        self.entries.get(&ip.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the table as a pretty-printed JSON object.
    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let map: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .map(|(ip, id)| (ip.as_str(), id.as_str()))
            .collect();
        let json = serde_json::to_string_pretty(&map).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::write(path, json).map_err(|e| io_err(path, e))
    }
}

/// Convert a CSV terminal table into its JSON form. Returns the entry count.
pub fn convert_csv_to_json(csv_path: &Path, json_path: &Path) -> Result<usize, ConfigError> {
    let table = TerminalTable::load_csv(csv_path)?;
    table.save_json(json_path)?;
    Ok(table.len())
}

// ---------------------------------------------------------------------------
// Resolvers
// ---------------------------------------------------------------------------

/// Probe the host address, then look it up in a table.
#[derive(Debug, Clone)]
pub struct TableResolver<P> {
    probe: P,
    table: TerminalTable,
}

impl<P: AddressProbe> TableResolver<P> {
    pub fn new(probe: P, table: TerminalTable) -> Self {
        Self { probe, table }
    }

    /// The address the probe reports right now.
    pub fn address(&self) -> Option<IpAddr> {
        self.probe.resolve()
    }
}

impl<P: AddressProbe> IdentityResolver for TableResolver<P> {
    fn resolve_terminal_id(&self) -> Option<TerminalId> {
        let ip = self.probe.resolve()?;
        self.table.lookup(ip).cloned()
    }
}

/// A terminal id pinned in configuration.
#[derive(Debug, Clone)]
pub struct StaticResolver(pub TerminalId);

impl IdentityResolver for StaticResolver {
    fn resolve_terminal_id(&self) -> Option<TerminalId> {
        Some(self.0.clone())
    }
}
