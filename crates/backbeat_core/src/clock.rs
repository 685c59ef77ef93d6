//! # Beat Clock
//!
//! Converts raw clock samples (seconds, as read from the audio device or the
//! host game loop) into a song position measured in beats.
//!
//! ## Timeline
//!
//! ```text
//!  origin                                   now
//!    │                                       │
//!    ▼  beat 0      beat 1      beat 2       ▼  beat 3
//!    ├───────────┼───────────┼───────────┼───┴───────┤
//!    │◄── spb ──►│                         │◄─►│
//!                                           phase
//! ```
//!
//! The clock is sampled once per tick. Frame hitches that straddle several
//! beat boundaries still produce one beat event per boundary, in order, up
//! to [`MAX_CATCH_UP_BEATS`] per sample.
//!
//! ## Readiness
//!
//! Until [`BeatClock::start`] is called (the music has not started), the
//! clock is "not ready": [`BeatClock::advance`] yields nothing and
//! [`BeatClock::beat_phase`] returns `None`.

use crate::error::{ConfigError, CoreResult};

/// Seconds per minute, for bpm conversion.
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Beat index before any beat has fired in the current run.
const NO_BEAT_YET: i64 = -1;

/// Most beats a single [`BeatClock::advance`] reports. Older boundaries of a
/// larger jump are skipped (logged), the newest ones are still reported.
pub const MAX_CATCH_UP_BEATS: i64 = 4096;

/// A single beat boundary crossed during [`BeatClock::advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatTick {
    /// Index of the beat since the origin (beat 0 is the origin itself).
    pub index: i64,
    /// Clock time at which the boundary occurred.
    pub time: f64,
}

/// Beat boundaries crossed by one call to [`BeatClock::advance`].
///
/// The clock state is already updated when this is returned; iterating
/// only reports the crossed boundaries. Allocation-free.
#[derive(Clone, Debug)]
pub struct BeatEvents {
    next: i64,
    last: i64,
    anchor: f64,
    seconds_per_beat: f64,
}

impl BeatEvents {
    fn empty() -> Self {
        Self {
            next: 0,
            last: -1,
            anchor: 0.0,
            seconds_per_beat: 1.0,
        }
    }
}

impl Iterator for BeatEvents {
    type Item = BeatTick;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.last {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(BeatTick {
            index,
            time: self.anchor + index as f64 * self.seconds_per_beat,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last - self.next + 1).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BeatEvents {}

/// Fixed-tempo clock producing song position in beats.
#[derive(Clone, Debug)]
pub struct BeatClock {
    /// Tempo in beats per minute.
    tempo: f64,
    /// Derived: 60 / tempo.
    seconds_per_beat: f64,
    /// Clock time of beat 0. `None` until the music starts.
    origin: Option<f64>,
    /// Latency calibration subtracted from every sample.
    audio_offset: f64,
    /// Seconds since the origin at the last sample.
    song_position: f64,
    /// Highest beat index already reported.
    last_beat_index: i64,
}

impl BeatClock {
    /// Creates a stopped clock at the given tempo.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTempo`] if `tempo` is not a positive,
    /// finite number.
    pub fn new(tempo: f64) -> CoreResult<Self> {
        let seconds_per_beat = seconds_per_beat_for(tempo)?;
        Ok(Self {
            tempo,
            seconds_per_beat,
            origin: None,
            audio_offset: 0.0,
            song_position: 0.0,
            last_beat_index: NO_BEAT_YET,
        })
    }

    /// Sets the audio latency offset in seconds.
    ///
    /// A positive offset means the audio is heard later than the clock
    /// reports, so beats are shifted later by the same amount.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOffset`] if `offset` is not finite.
    pub fn with_audio_offset(mut self, offset: f64) -> CoreResult<Self> {
        if !offset.is_finite() {
            return Err(ConfigError::InvalidOffset(offset));
        }
        self.audio_offset = offset;
        Ok(self)
    }

    /// Starts a new run with beat 0 at `origin`.
    ///
    /// Starting again after [`stop`](Self::stop) begins a fresh run, so
    /// beat indices restart from 0.
    pub fn start(&mut self, origin: f64) {
        self.origin = Some(origin);
        self.song_position = 0.0;
        self.last_beat_index = NO_BEAT_YET;
        tracing::info!(
            "Beat clock started at {:.3}s ({} bpm, {:.3}s per beat)",
            origin,
            self.tempo,
            self.seconds_per_beat
        );
    }

    /// Stops the clock. It is "not ready" until started again.
    pub fn stop(&mut self) {
        if self.origin.take().is_some() {
            tracing::info!("Beat clock stopped after beat {}", self.last_beat_index);
        }
    }

    /// Advances to `current_time` and reports every beat boundary crossed.
    ///
    /// No-op while the clock is not started. Samples that move backwards
    /// update the phase but never re-fire beats.
    pub fn advance(&mut self, current_time: f64) -> BeatEvents {
        let Some(origin) = self.origin else {
            return BeatEvents::empty();
        };

        self.song_position = current_time - self.audio_offset - origin;
        let beat_index = (self.song_position / self.seconds_per_beat).floor() as i64;

        if beat_index <= self.last_beat_index {
            return BeatEvents::empty();
        }

        let mut next = self.last_beat_index + 1;
        let crossed = beat_index - self.last_beat_index;
        if crossed > MAX_CATCH_UP_BEATS {
            next = beat_index - MAX_CATCH_UP_BEATS + 1;
            tracing::warn!(
                "Beat clock jumped {} beats in one sample, skipping {}",
                crossed,
                crossed - MAX_CATCH_UP_BEATS
            );
        }

        let events = BeatEvents {
            next,
            last: beat_index,
            anchor: origin + self.audio_offset,
            seconds_per_beat: self.seconds_per_beat,
        };
        self.last_beat_index = beat_index;
        events
    }

    /// Fractional position within the current beat, in `[0, 1)`.
    ///
    /// Returns `None` while the clock is not started.
    #[must_use]
    pub fn beat_phase(&self) -> Option<f64> {
        self.origin?;
        let phase = (self.song_position / self.seconds_per_beat).rem_euclid(1.0);
        // rem_euclid can round up to exactly 1.0 for tiny negative inputs
        Some(if phase >= 1.0 { 0.0 } else { phase })
    }

    /// Song position in (fractional) beats, or `None` if not started.
    #[must_use]
    pub fn beat_position(&self) -> Option<f64> {
        self.origin.map(|_| self.song_position / self.seconds_per_beat)
    }

    /// Changes tempo without moving the current beat position.
    ///
    /// The origin is re-anchored so that the song position in beats at
    /// `current_time` is identical before and after the change; no beat
    /// re-fires and none is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTempo`] and leaves the clock untouched
    /// if `tempo` is invalid.
    pub fn set_tempo(&mut self, tempo: f64, current_time: f64) -> CoreResult<()> {
        let seconds_per_beat = seconds_per_beat_for(tempo)?;

        if let Some(origin) = self.origin {
            let beats = (current_time - self.audio_offset - origin) / self.seconds_per_beat;
            self.origin = Some(current_time - self.audio_offset - beats * seconds_per_beat);
            self.song_position = beats * seconds_per_beat;
        }

        tracing::info!("Tempo changed: {} -> {} bpm", self.tempo, tempo);
        self.tempo = tempo;
        self.seconds_per_beat = seconds_per_beat;
        Ok(())
    }

    /// Phase-locks the clock to the audio stream.
    ///
    /// `audio_position` is the playback position reported by the audio
    /// device at `current_time`. Returns the origin correction in seconds
    /// (positive = the clock was running ahead of the audio), or `None`
    /// if the clock is not started.
    ///
    /// The beat index is never rewound: a backwards correction delays the
    /// next beat event instead of repeating one.
    pub fn resync(&mut self, audio_position: f64, current_time: f64) -> Option<f64> {
        let origin = self.origin?;
        let new_origin = current_time - self.audio_offset - audio_position;
        self.origin = Some(new_origin);
        self.song_position = audio_position;
        Some(new_origin - origin)
    }

    /// Returns the tempo in beats per minute.
    #[inline]
    #[must_use]
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Returns the length of one beat in seconds.
    #[inline]
    #[must_use]
    pub fn seconds_per_beat(&self) -> f64 {
        self.seconds_per_beat
    }

    /// Returns the configured audio offset in seconds.
    #[inline]
    #[must_use]
    pub fn audio_offset(&self) -> f64 {
        self.audio_offset
    }

    /// Returns `true` once the music has started.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.origin.is_some()
    }

    /// Highest beat index reported so far (-1 before the first beat).
    #[inline]
    #[must_use]
    pub fn last_beat_index(&self) -> i64 {
        self.last_beat_index
    }

    /// Seconds since beat 0 at the last sample, or `None` if not started.
    #[must_use]
    pub fn song_position(&self) -> Option<f64> {
        self.origin.map(|_| self.song_position)
    }

    /// Clock time of beat `index`, or `None` if not started.
    #[must_use]
    pub fn time_of_beat(&self, index: i64) -> Option<f64> {
        self.origin
            .map(|origin| origin + self.audio_offset + index as f64 * self.seconds_per_beat)
    }
}

/// Validates a tempo and converts it to seconds per beat.
fn seconds_per_beat_for(tempo: f64) -> CoreResult<f64> {
    if !tempo.is_finite() || tempo <= 0.0 {
        return Err(ConfigError::InvalidTempo(tempo));
    }
    Ok(SECONDS_PER_MINUTE / tempo)
}
