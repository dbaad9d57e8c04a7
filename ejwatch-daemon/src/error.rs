use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watcher: state store, archiver, copy, runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ejwatch_core::ConfigError),

    #[error("corrupt rollover state in {path}: {detail}")]
    CorruptState { path: PathBuf, detail: String },

    #[error("cannot prepare directory {path}: {source}")]
    Startup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{task} task join failure: {detail}")]
    Join { task: &'static str, detail: String },

    #[error("signal handler failed: {0}")]
    Signal(std::io::Error),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
