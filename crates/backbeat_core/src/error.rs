//! # Core Error Types
//!
//! Configuration errors are fatal at setup: an engine built from invalid
//! values must never start. Missing context at runtime (no clock origin,
//! no live marker) is NOT an error and never shows up here.

use thiserror::Error;

/// Errors raised while validating rhythm configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Tempo is zero, negative, or not a finite number.
    #[error("tempo must be a positive, finite bpm value, got {0}")]
    InvalidTempo(f64),

    /// Hit window half-width is zero, negative, or not finite.
    #[error("hit window must be a positive number of seconds, got {0}")]
    InvalidWindow(f64),

    /// Hit window reaches half a beat, so every phase would be on-beat.
    #[error("hit window of {window_seconds}s must be below half a beat ({limit_seconds}s at this tempo)")]
    WindowTooWide {
        /// Configured half-width in seconds.
        window_seconds: f64,
        /// Exclusive upper bound (half a beat) in seconds.
        limit_seconds: f64,
    },

    /// Attack marker lifetime is zero, negative, or not finite.
    #[error("marker ttl must be a positive number of seconds, got {0}")]
    InvalidTtl(f64),

    /// Multiplier cap below the neutral multiplier.
    #[error("max multiplier must be at least 1.0, got {0}")]
    InvalidMaxMultiplier(f32),

    /// Multiplier increment is negative or not finite.
    #[error("multiplier increment must be finite and non-negative, got {0}")]
    InvalidIncrement(f32),

    /// A miss streak of zero would reset the combo before any miss.
    #[error("miss streak to reset must be at least 1")]
    ZeroMissStreak,

    /// Audio latency offset is not a finite number.
    #[error("audio offset must be finite, got {0}")]
    InvalidOffset(f64),
}

/// Result type for core configuration.
pub type CoreResult<T> = Result<T, ConfigError>;
