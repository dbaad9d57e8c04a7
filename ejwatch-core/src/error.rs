//! Error types for ejwatch-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading settings or the terminal table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file did not exist at the expected path.
    #[error("settings not found at {path}")]
    SettingsNotFound { path: PathBuf },

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required setting is absent or empty.
    #[error("setting '{0}' is missing or empty")]
    MissingSetting(&'static str),

    #[error("tick_interval_secs must be at least 1")]
    InvalidTickInterval,

    #[error("either 'terminal_table' or 'terminal_id' must be configured")]
    NoIdentitySource,

    #[error("terminal id must not be empty")]
    EmptyTerminalId,

    #[error("invalid calendar day '{0}'; expected YYYY_MM_DD")]
    InvalidDay(String),

    #[error("unknown rotation mode '{0}'; expected: archive, discard")]
    InvalidRotationMode(String),

    /// Terminal tables must be `.csv` or `.json`.
    #[error("unsupported terminal table format at {path}; expected .csv or .json")]
    UnsupportedTable { path: PathBuf },

    #[error("terminal table at {path} contains no entries")]
    EmptyTable { path: PathBuf },

    #[error("failed to read CSV table at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read JSON table at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
