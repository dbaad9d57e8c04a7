use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use ejwatch_core::{RotationMode, Settings, TerminalId, WatchTarget};

use crate::clock::SystemClock;
use crate::error::{io_err, DaemonError};
use crate::events::TracingSink;
use crate::log_rotation::rotate_service_log;
use crate::monitor::{self, Monitor};
use crate::state_store::RolloverStateStore;

/// Everything the watcher needs once startup checks have passed.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target: WatchTarget,
    pub terminal: TerminalId,
    pub state_file: PathBuf,
    pub log_file: Option<PathBuf>,
    pub tick_interval: Duration,
    pub rotation_mode: RotationMode,
}

impl RunOptions {
    pub fn from_settings(settings: &Settings, terminal: TerminalId) -> Self {
        Self {
            target: settings.target.clone(),
            terminal,
            state_file: settings.state_file.clone(),
            log_file: Some(settings.log_file.clone()),
            tick_interval: settings.tick_interval,
            rotation_mode: settings.rotation_mode,
        }
    }
}

/// Start the watcher and block the current thread until it is stopped.
pub fn start_blocking(options: RunOptions) -> Result<(), DaemonError> {
    init_tracing(options.log_file.as_deref());
    prepare_directories(&options.target, options.rotation_mode)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(options))
}

/// Create the destination directory, and the dump directory when archiving.
///
/// Failing here is a startup precondition failure; nothing is retried.
pub fn prepare_directories(target: &WatchTarget, mode: RotationMode) -> Result<(), DaemonError> {
    let mut dirs = vec![&target.destination_directory];
    if mode == RotationMode::Archive {
        dirs.push(&target.dump_directory);
    }
    for dir in dirs {
        fs::create_dir_all(dir).map_err(|source| DaemonError::Startup {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Run the monitor with the system clock until ctrl-c or SIGTERM.
pub async fn run(options: RunOptions) -> Result<(), DaemonError> {
    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let monitor = Monitor::new(
        options.target,
        options.terminal,
        RolloverStateStore::new(options.state_file),
        Arc::new(SystemClock),
        Arc::new(TracingSink),
        options.rotation_mode,
    );

    let monitor_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        let interval = options.tick_interval;
        tokio::spawn(async move {
            let result = monitor::run(monitor, interval, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = shutdown_signal() => match signal {
                    Ok(name) => {
                        tracing::info!(signal = name, "shutting down watcher");
                        let _ = shutdown.send(());
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
        })
    };

    let (monitor_result, signal_result) = tokio::join!(monitor_handle, signal_handle);
    handle_join("monitor", monitor_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).map_err(DaemonError::Signal)?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "ctrl-c").map_err(DaemonError::Signal),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    tokio::signal::ctrl_c()
        .await
        .map(|()| "ctrl-c")
        .map_err(DaemonError::Signal)
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            detail: err.to_string(),
        }),
    }
}

/// Log to stdout and, when configured, to the service log file.
fn init_tracing(log_file: Option<&Path>) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let mut rotated = Ok(false);
    let mut file_layer = None;
    let mut open_error = None;
    if let Some(path) = log_file {
        rotated = rotate_service_log(path);
        match open_log(path) {
            Ok(file) => {
                file_layer = Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(Mutex::new(file)),
                )
            }
            Err(err) => open_error = Some(err),
        }
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();

    if let Some(path) = log_file {
        match rotated {
            Ok(true) => tracing::info!(path = %path.display(), "service log rotated"),
            Ok(false) => {}
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "service log rotation failed"),
        }
        if let Some(err) = open_error {
            tracing::warn!(path = %path.display(), error = %err, "service log unavailable, logging to stdout only");
        }
    }
}

fn open_log(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
