//! Journal watcher runtime: rollover state, change detection, rotation,
//! archiving, and the monitor loop that ties them together.

pub mod archiver;
pub mod clock;
pub mod detector;
mod error;
pub mod events;
pub mod log_rotation;
pub mod monitor;
pub mod paths;
pub mod rotation;
mod runtime;
pub mod state_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use detector::FileFingerprint;
pub use error::DaemonError;
pub use events::{EventSink, MemorySink, MonitorEvent, TracingSink};
pub use monitor::{Monitor, TickReport};
pub use rotation::{ClearOutcome, Rotator, Transition};
pub use runtime::{prepare_directories, run, start_blocking, RunOptions};
pub use state_store::RolloverStateStore;
