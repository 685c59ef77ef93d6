//! # Rhythm Configuration
//!
//! All tuning is set once before a match and read-only afterwards.
//! Values can come from code ([`RhythmConfig::default`] plus struct update
//! syntax) or from a TOML file:
//!
//! ```toml
//! tempo_bpm = 128.0
//! window_seconds = 0.12
//! max_multiplier = 2.5
//! multiplier_increment = 0.15
//! miss_streak_to_reset = 2
//! marker_ttl_seconds = 0.5
//! audio_offset_seconds = 0.0
//! whiff_policy = "count_as_miss"
//! event_capacity = 1024
//! ```
//!
//! Missing keys fall back to the defaults. Unknown keys are rejected so
//! typos surface before the match starts.

use std::path::Path;

use backbeat_core::{BeatClock, ComboRules, CoreResult, HitWindowClassifier};
use serde::{Deserialize, Serialize};

use crate::error::{RhythmError, RhythmResult};
use crate::sync::WhiffPolicy;

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RhythmConfig {
    /// Tempo in beats per minute.
    pub tempo_bpm: f64,
    /// Half-width of the on-beat window in seconds.
    pub window_seconds: f64,
    /// Cap on the combo multiplier.
    pub max_multiplier: f32,
    /// Multiplier gained per consecutive rhythm hit.
    pub multiplier_increment: f32,
    /// Consecutive misses that break a combo.
    pub miss_streak_to_reset: u32,
    /// Lifetime of an unresolved attack marker in seconds.
    pub marker_ttl_seconds: f64,
    /// Audio latency calibration in seconds.
    pub audio_offset_seconds: f64,
    /// What a whiffed attack does to the combo.
    pub whiff_policy: WhiffPolicy,
    /// Capacity of each event channel.
    pub event_capacity: usize,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            window_seconds: 0.1,
            max_multiplier: 2.0,
            multiplier_increment: 0.1,
            miss_streak_to_reset: 2,
            marker_ttl_seconds: 0.5,
            audio_offset_seconds: 0.0,
            whiff_policy: WhiffPolicy::CountAsMiss,
            event_capacity: 1024,
        }
    }
}

impl RhythmConfig {
    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RhythmError::Parse`] for malformed TOML or unknown keys, and
    /// a validation error for out-of-range values.
    pub fn from_toml_str(text: &str) -> RhythmResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| RhythmError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`RhythmError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> RhythmResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RhythmError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded rhythm config from {}", path.display());
        Ok(config)
    }

    /// Checks every value without building anything long-lived.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> RhythmResult<()> {
        let clock = self.build_clock()?;
        self.build_classifier(clock.seconds_per_beat())?;
        self.combo_rules()?;
        if !self.marker_ttl_seconds.is_finite() || self.marker_ttl_seconds <= 0.0 {
            return Err(backbeat_core::ConfigError::InvalidTtl(self.marker_ttl_seconds).into());
        }
        if self.event_capacity == 0 {
            return Err(RhythmError::ZeroEventCapacity);
        }
        Ok(())
    }

    /// Builds a stopped beat clock with the configured tempo and offset.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid tempo or offset.
    pub fn build_clock(&self) -> CoreResult<BeatClock> {
        BeatClock::new(self.tempo_bpm)?.with_audio_offset(self.audio_offset_seconds)
    }

    /// Builds the hit window classifier for the given beat length.
    ///
    /// # Errors
    ///
    /// Returns an error if the window is not positive or reaches half a beat.
    pub fn build_classifier(&self, seconds_per_beat: f64) -> CoreResult<HitWindowClassifier> {
        HitWindowClassifier::new(self.window_seconds, seconds_per_beat)
    }

    /// Builds the combo rules.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid multiplier cap, increment or streak.
    pub fn combo_rules(&self) -> CoreResult<ComboRules> {
        ComboRules::new(
            self.max_multiplier,
            self.multiplier_increment,
            self.miss_streak_to_reset,
        )
    }
}
