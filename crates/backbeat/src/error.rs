//! # Engine Error Types
//!
//! Everything here is a setup failure. Once an engine is built, no
//! operation on it returns an error: missing timing context degrades to
//! "no bonus" and repeated signals are no-ops.

use backbeat_core::ConfigError;
use thiserror::Error;

/// Errors that prevent the rhythm engine from starting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RhythmError {
    /// A tuning value is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configuration text is not valid TOML for [`crate::RhythmConfig`].
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {reason}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying IO error message.
        reason: String,
    },

    /// Event channels need room for at least one event.
    #[error("event channel capacity must be at least 1")]
    ZeroEventCapacity,
}

/// Result type for engine setup.
pub type RhythmResult<T> = Result<T, RhythmError>;
