//! Domain types shared by the watcher and the CLI.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of the physical terminal whose journal is being captured.
///
/// Always non-empty; embedded verbatim in destination file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TerminalId(String);

impl TerminalId {
    /// Build a terminal id, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ConfigError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyTerminalId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for TerminalId {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TerminalId> for String {
    fn from(id: TerminalId) -> Self {
        id.0
    }
}

/// A local calendar date, written as `YYYY_MM_DD` on disk and in file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// `strftime` pattern used for state records and destination names.
    pub const FORMAT: &'static str = "%Y_%m_%d";

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Signed number of days from `earlier` to `self`.
    pub fn days_since(&self, earlier: CalendarDay) -> i64 {
        (self.0 - earlier.0).num_days()
    }
}

impl From<NaiveDate> for CalendarDay {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}_{:02}_{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl FromStr for CalendarDay {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveDate::parse_from_str(trimmed, Self::FORMAT)
            .map(Self)
            .map_err(|_| ConfigError::InvalidDay(trimmed.to_owned()))
    }
}

impl Serialize for CalendarDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What happens to the source file when the day rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationMode {
    /// Move the source into the dump directory under a timestamped name.
    #[default]
    Archive,
    /// Delete the source outright.
    Discard,
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationMode::Archive => write!(f, "archive"),
            RotationMode::Discard => write!(f, "discard"),
        }
    }
}

impl FromStr for RotationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "archive" => Ok(Self::Archive),
            "discard" => Ok(Self::Discard),
            _ => Err(ConfigError::InvalidRotationMode(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// The file being watched and where its copies go. Validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchTarget {
    pub source_path: PathBuf,
    pub destination_directory: PathBuf,
    /// Archive location for pre-rollover sources.
    pub dump_directory: PathBuf,
}

impl WatchTarget {
    /// Name of the dump directory used when none is configured.
    pub const DEFAULT_DUMP_DIR: &'static str = "EJ_dump";

    /// Build a target, deriving `dump_directory` from the destination when absent.
    pub fn new(
        source_path: impl Into<PathBuf>,
        destination_directory: impl Into<PathBuf>,
        dump_directory: Option<PathBuf>,
    ) -> Self {
        let destination_directory = destination_directory.into();
        let dump_directory = dump_directory
            .unwrap_or_else(|| destination_directory.join(Self::DEFAULT_DUMP_DIR));
        Self {
            source_path: source_path.into(),
            destination_directory,
            dump_directory,
        }
    }

    /// `<destination_directory>/<YYYY_MM_DD>_<terminal_id>.log`
    pub fn destination_for(&self, day: CalendarDay, terminal: &TerminalId) -> PathBuf {
        self.destination_directory
            .join(format!("{day}_{terminal}.log"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_id_rejects_blank() {
        assert!(TerminalId::new("").is_err());
        assert!(TerminalId::new("   ").is_err());
        assert_eq!(TerminalId::new(" T42 ").unwrap().as_str(), "T42");
    }

    #[test]
    fn calendar_day_display_and_parse() {
        let day = CalendarDay::from_ymd(2024, 5, 1).unwrap();
        assert_eq!(day.to_string(), "2024_05_01");
        assert_eq!("2024_05_01\n".parse::<CalendarDay>().unwrap(), day);
        assert!("2024-05-01".parse::<CalendarDay>().is_err());
        assert!("garbage".parse::<CalendarDay>().is_err());
    }

    #[test]
    fn days_since_counts_gap() {
        let d = CalendarDay::from_ymd(2024, 2, 28).unwrap();
        let later = CalendarDay::from_ymd(2024, 3, 2).unwrap();
        assert_eq!(later.days_since(d), 3);
        assert_eq!(d.days_since(later), -3);
    }

    #[test]
    fn rotation_mode_parse_and_display() {
        assert_eq!("Archive".parse::<RotationMode>().unwrap(), RotationMode::Archive);
        assert_eq!("discard".parse::<RotationMode>().unwrap(), RotationMode::Discard);
        assert!("delete".parse::<RotationMode>().is_err());
        assert_eq!(RotationMode::default().to_string(), "archive");
    }

    #[test]
    fn destination_path_follows_naming_convention() {
        let target = WatchTarget::new("/src/EJDATA.LOG", "/dest", None);
        let day = CalendarDay::from_ymd(2024, 5, 1).unwrap();
        let terminal = TerminalId::new("T42").unwrap();
        assert_eq!(
            target.destination_for(day, &terminal),
            PathBuf::from("/dest/2024_05_01_T42.log")
        );
        assert_eq!(target.dump_directory, PathBuf::from("/dest/EJ_dump"));
    }
}
