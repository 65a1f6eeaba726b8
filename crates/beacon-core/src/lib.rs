//! # Beacon Core
//!
//! Shared vocabulary for the Beacon notification tracker: domain enums,
//! the error type, the accumulating validation report, and the TOML
//! configuration system.

pub mod config;
pub mod error;
pub mod types;

pub use config::BeaconConfig;
pub use error::{BeaconError, Result};
pub use types::{
    BackoffStrategy, ChannelKind, ChannelStatus, NotificationKind, NotificationStatus, Priority,
    ValidationReport,
};
