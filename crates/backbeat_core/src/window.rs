//! # Hit Window Classifier
//!
//! Decides whether a beat phase counts as "on beat".
//!
//! Phase is measured from the last beat, so the acceptance window wraps
//! around the boundary: the tail of one beat (slightly early for the next
//! boundary) and the head of the next (slightly late) are both accepted.
//!
//! ```text
//! phase  0.0        w                         1-w        1.0
//!         ├─────────┤                          ├──────────┤
//!         │  LATE   │         OFF BEAT         │  EARLY   │
//!         └─────────┴──────────────────────────┴──────────┘
//! ```
//!
//! This continuous phase test is the only definition of "on beat" in the
//! engine.

use crate::error::{ConfigError, CoreResult};

/// Upper bound (exclusive) for the window as a fraction of one beat.
const MAX_WINDOW_FRACTION: f64 = 0.5;

/// Timing of an attack relative to the nearest beat boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BeatTiming {
    /// On beat, before the boundary. Offset is negative seconds.
    Early {
        /// Signed distance to the nearest boundary in seconds.
        offset_seconds: f64,
    },
    /// On beat, at or after the boundary. Offset is non-negative seconds.
    Late {
        /// Signed distance to the nearest boundary in seconds.
        offset_seconds: f64,
    },
    /// Outside the hit window.
    OffBeat {
        /// Signed distance to the nearest boundary in seconds.
        offset_seconds: f64,
    },
    /// The clock had not started; no timing information exists.
    NotReady,
}

impl BeatTiming {
    /// Returns `true` for [`Early`](Self::Early) and [`Late`](Self::Late).
    #[inline]
    #[must_use]
    pub fn is_on_beat(self) -> bool {
        matches!(self, Self::Early { .. } | Self::Late { .. })
    }

    /// Signed distance to the nearest beat, if known.
    #[must_use]
    pub fn offset_seconds(self) -> Option<f64> {
        match self {
            Self::Early { offset_seconds }
            | Self::Late { offset_seconds }
            | Self::OffBeat { offset_seconds } => Some(offset_seconds),
            Self::NotReady => None,
        }
    }
}

/// Classifies beat phases against a fixed window half-width.
///
/// Holds no state beyond its configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitWindowClassifier {
    /// Half-width of the acceptance window in seconds.
    window_seconds: f64,
}

impl HitWindowClassifier {
    /// Creates a classifier, validating the window against the tempo.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidWindow`] if `window_seconds` is not positive
    /// - [`ConfigError::WindowTooWide`] if the window reaches half a beat
    pub fn new(window_seconds: f64, seconds_per_beat: f64) -> CoreResult<Self> {
        if !window_seconds.is_finite() || window_seconds <= 0.0 {
            return Err(ConfigError::InvalidWindow(window_seconds));
        }
        let classifier = Self { window_seconds };
        classifier.validate_for(seconds_per_beat)?;
        Ok(classifier)
    }

    /// Re-checks the window against a (possibly new) beat length.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WindowTooWide`] if the window would cover half
    /// a beat or more.
    pub fn validate_for(&self, seconds_per_beat: f64) -> CoreResult<()> {
        if self.window_fraction(seconds_per_beat) >= MAX_WINDOW_FRACTION {
            return Err(ConfigError::WindowTooWide {
                window_seconds: self.window_seconds,
                limit_seconds: seconds_per_beat * MAX_WINDOW_FRACTION,
            });
        }
        Ok(())
    }

    /// Returns the window half-width in seconds.
    #[inline]
    #[must_use]
    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Window half-width as a fraction of one beat.
    #[inline]
    #[must_use]
    pub fn window_fraction(&self, seconds_per_beat: f64) -> f64 {
        self.window_seconds / seconds_per_beat
    }

    /// Returns `true` if `beat_phase` lies within the window of a boundary.
    #[inline]
    #[must_use]
    pub fn is_on_beat(&self, beat_phase: f64, seconds_per_beat: f64) -> bool {
        let w = self.window_fraction(seconds_per_beat);
        beat_phase > 1.0 - w || beat_phase < w
    }

    /// Classifies a phase with its signed offset to the nearest boundary.
    ///
    /// Agrees with [`is_on_beat`](Self::is_on_beat) for every phase.
    #[must_use]
    pub fn classify(&self, beat_phase: f64, seconds_per_beat: f64) -> BeatTiming {
        let offset_seconds = if beat_phase >= 0.5 {
            (beat_phase - 1.0) * seconds_per_beat
        } else {
            beat_phase * seconds_per_beat
        };

        if !self.is_on_beat(beat_phase, seconds_per_beat) {
            BeatTiming::OffBeat { offset_seconds }
        } else if beat_phase >= 0.5 {
            BeatTiming::Early { offset_seconds }
        } else {
            BeatTiming::Late { offset_seconds }
        }
    }

    /// Classifies an optional phase; `None` means the clock is not ready.
    #[must_use]
    pub fn classify_phase(
        &self,
        beat_phase: Option<f64>,
        seconds_per_beat: f64,
    ) -> BeatTiming {
        beat_phase.map_or(BeatTiming::NotReady, |phase| self.classify(phase, seconds_per_beat))
    }
}
