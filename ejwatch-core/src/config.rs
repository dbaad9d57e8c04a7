//! Settings loader.
//!
//! # File layout
//!
//! ```yaml
//! source: C:/coreEJ/EJDATA.LOG
//! destination: D:/CopyEJ
//! dump_directory: D:/EJ_dump        # default <destination>/EJ_dump
//! terminal_table: ip_terminal_id.csv
//! terminal_id: null                 # static override, skips the table
//! tick_interval_secs: 5
//! rotation_mode: archive            # archive | discard
//! state_file: ejwatch_state.txt
//! log_file: monitoring.log
//! ```
//!
//! Relative paths are resolved against the directory holding the settings file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{io_err, ConfigError};
use crate::types::{RotationMode, TerminalId, WatchTarget};

pub const DEFAULT_SETTINGS_FILE: &str = "ejwatch.yaml";
pub const DEFAULT_TICK_SECS: u64 = 5;
pub const DEFAULT_STATE_FILE: &str = "ejwatch_state.txt";
pub const DEFAULT_LOG_FILE: &str = "monitoring.log";

/// On-disk shape. Every field is optional so missing keys produce
/// [`ConfigError::MissingSetting`] rather than an opaque YAML error.
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    dump_directory: Option<PathBuf>,
    terminal_table: Option<PathBuf>,
    terminal_id: Option<String>,
    tick_interval_secs: Option<u64>,
    rotation_mode: Option<String>,
    state_file: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

/// Validated, immutable startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Location of the settings file this was loaded from.
    pub path: PathBuf,
    pub target: WatchTarget,
    pub terminal_table: Option<PathBuf>,
    pub terminal_id: Option<TerminalId>,
    pub tick_interval: Duration,
    pub rotation_mode: RotationMode,
    /// Where the last-known-day record lives.
    pub state_file: PathBuf,
    /// Service log written alongside stdout.
    pub log_file: PathBuf,
}

impl Settings {
    /// Load and validate the settings file at `path`.
    ///
    /// Returns `ConfigError::SettingsNotFound` if absent,
    /// `ConfigError::Parse` (with path + line context) if malformed YAML.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::SettingsNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::from_yaml_str(&contents, path)
    }

    /// Parse settings from YAML text as if it had been read from `path`.
    pub fn from_yaml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawSettings = if contents.trim().is_empty() {
            RawSettings::default()
        } else {
            serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?
        };
        let base = base_dir(path);
        Self::validate(raw, &base, path)
    }

    /// The watch target this configuration describes.
    pub fn watch_target(&self) -> &WatchTarget {
        &self.target
    }

    fn validate(raw: RawSettings, base: &Path, path: &Path) -> Result<Self, ConfigError> {
        let source = required_path(raw.source, "source")?;
        let destination = required_path(raw.destination, "destination")?;

        let terminal_id = match raw.terminal_id {
            Some(id) => Some(TerminalId::new(id)?),
            None => None,
        };
        let terminal_table = non_empty(raw.terminal_table).map(|p| resolve(base, p));
        if terminal_id.is_none() && terminal_table.is_none() {
            return Err(ConfigError::NoIdentitySource);
        }

        let tick_secs = raw.tick_interval_secs.unwrap_or(DEFAULT_TICK_SECS);
        if tick_secs == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }

        let rotation_mode = match raw.rotation_mode {
            Some(mode) => mode.parse::<RotationMode>()?,
            None => RotationMode::default(),
        };

        let target = WatchTarget::new(
            resolve(base, source),
            resolve(base, destination),
            non_empty(raw.dump_directory).map(|p| resolve(base, p)),
        );

        Ok(Self {
            path: path.to_path_buf(),
            target,
            terminal_table,
            terminal_id,
            tick_interval: Duration::from_secs(tick_secs),
            rotation_mode,
            state_file: resolve(
                base,
                non_empty(raw.state_file).unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            ),
            log_file: resolve(
                base,
                non_empty(raw.log_file).unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            ),
        })
    }
}

fn base_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn non_empty(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

fn required_path(path: Option<PathBuf>, key: &'static str) -> Result<PathBuf, ConfigError> {
    non_empty(path).ok_or(ConfigError::MissingSetting(key))
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Settings, ConfigError> {
        Settings::from_yaml_str(yaml, Path::new("/etc/ejwatch/ejwatch.yaml"))
    }

    #[test]
    fn minimal_settings_fill_defaults() {
        let settings = parse(
            "source: /atm/EJDATA.LOG\ndestination: /copy\nterminal_id: T42\n",
        )
        .unwrap();
        assert_eq!(settings.target.source_path, PathBuf::from("/atm/EJDATA.LOG"));
        assert_eq!(settings.target.dump_directory, PathBuf::from("/copy/EJ_dump"));
        assert_eq!(settings.tick_interval, Duration::from_secs(DEFAULT_TICK_SECS));
        assert_eq!(settings.rotation_mode, RotationMode::Archive);
        assert_eq!(
            settings.state_file,
            PathBuf::from("/etc/ejwatch").join(DEFAULT_STATE_FILE)
        );
        assert_eq!(settings.terminal_id.unwrap().as_str(), "T42");
    }

    #[test]
    fn relative_paths_resolve_against_settings_dir() {
        let settings = parse(
            "source: coreEJ/EJDATA.LOG\ndestination: CopyEJ\nterminal_table: ids.csv\nrotation_mode: discard\n",
        )
        .unwrap();
        assert_eq!(
            settings.target.source_path,
            PathBuf::from("/etc/ejwatch/coreEJ/EJDATA.LOG")
        );
        assert_eq!(
            settings.terminal_table,
            Some(PathBuf::from("/etc/ejwatch/ids.csv"))
        );
        assert_eq!(settings.rotation_mode, RotationMode::Discard);
    }

    #[test]
    fn missing_destination_is_reported_by_key() {
        let err = parse("source: /a\nterminal_id: T1\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting("destination")), "got: {err}");
    }

    #[test]
    fn empty_file_reports_missing_source() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting("source")), "got: {err}");
    }

    #[test]
    fn identity_source_is_required() {
        let err = parse("source: /a\ndestination: /b\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoIdentitySource), "got: {err}");
    }

    #[test]
    fn zero_tick_interval_rejected() {
        let err = parse("source: /a\ndestination: /b\nterminal_id: T\ntick_interval_secs: 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTickInterval));
    }

    #[test]
    fn unknown_rotation_mode_is_rejected() {
        let err = parse("source: /a\ndestination: /b\nterminal_id: T\nrotation_mode: shred\n")
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidRotationMode(ref mode) if mode == "shred"),
            "got: {err}"
        );
    }

    #[test]
    fn rotation_mode_ignores_case() {
        let settings =
            parse("source: /a\ndestination: /b\nterminal_id: T\nrotation_mode: Discard\n")
                .unwrap();
        assert_eq!(settings.rotation_mode, RotationMode::Discard);
    }
}
