//! Beacon error type, shared across all crates.

use thiserror::Error;

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, BeaconError>;

/// All errors Beacon can produce.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Configuration loading/parsing failed.
    #[error("config error: {0}")]
    Config(String),

    /// Persistence layer failure.
    #[error("store error: {0}")]
    Store(String),

    /// Construction rejected by validation. Carries every violated rule.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
