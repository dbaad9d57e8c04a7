//! ejwatch core library: domain types, settings, terminal identity, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and the validated [`WatchTarget`]
//! - [`config`]: [`Settings`] loader
//! - [`identity`]: terminal table and resolvers
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::Settings;
pub use error::ConfigError;
pub use identity::{
    convert_csv_to_json, AddressProbe, FixedAddress, IdentityResolver, StaticResolver,
    TableResolver, TerminalTable, UdpRouteProbe,
};
pub use types::{CalendarDay, RotationMode, TerminalId, WatchTarget};
