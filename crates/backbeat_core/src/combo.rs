//! # Combo Tracker
//!
//! Per-combatant combo state machine driving the damage multiplier.
//!
//! ## States
//!
//! - **Neutral**: combo count is 0.
//! - **Building**: combo count > 0, no misses since the last rhythm hit.
//! - **AtRisk**: combo count > 0, some misses but fewer than the reset threshold.
//!
//! ```text
//!              hit                     hit
//!   ┌─────────┐────>┌──────────┐ miss ┌────────┐
//!   │ NEUTRAL │     │ BUILDING │─────>│ AT RISK│──┐
//!   └─────────┘<────└──────────┘<─────└────────┘  │ miss
//!        ▲    streak reached    hit               │ (streak < reset)
//!        └────────────────────────────────────────┘
//! ```
//!
//! The multiplier is ALWAYS derived from the combo count:
//! `min(1.0 + combo * increment, max_multiplier)`.

use crate::error::{ConfigError, CoreResult};

/// Multiplier with no combo.
pub const NEUTRAL_MULTIPLIER: f32 = 1.0;

/// Tuning for the combo multiplier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComboRules {
    /// Cap on the multiplier.
    max_multiplier: f32,
    /// Multiplier gained per consecutive rhythm hit.
    multiplier_increment: f32,
    /// Consecutive misses that break the combo.
    miss_streak_to_reset: u32,
}

impl ComboRules {
    /// Creates validated combo rules.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidMaxMultiplier`] if `max_multiplier < 1.0`
    /// - [`ConfigError::InvalidIncrement`] if the increment is negative or not finite
    /// - [`ConfigError::ZeroMissStreak`] if `miss_streak_to_reset == 0`
    pub fn new(
        max_multiplier: f32,
        multiplier_increment: f32,
        miss_streak_to_reset: u32,
    ) -> CoreResult<Self> {
        if !max_multiplier.is_finite() || max_multiplier < NEUTRAL_MULTIPLIER {
            return Err(ConfigError::InvalidMaxMultiplier(max_multiplier));
        }
        if !multiplier_increment.is_finite() || multiplier_increment < 0.0 {
            return Err(ConfigError::InvalidIncrement(multiplier_increment));
        }
        if miss_streak_to_reset == 0 {
            return Err(ConfigError::ZeroMissStreak);
        }
        Ok(Self {
            max_multiplier,
            multiplier_increment,
            miss_streak_to_reset,
        })
    }

    /// Returns the multiplier cap.
    #[inline]
    #[must_use]
    pub fn max_multiplier(&self) -> f32 {
        self.max_multiplier
    }

    /// Returns the per-hit multiplier increment.
    #[inline]
    #[must_use]
    pub fn multiplier_increment(&self) -> f32 {
        self.multiplier_increment
    }

    /// Returns the number of consecutive misses that break a combo.
    #[inline]
    #[must_use]
    pub fn miss_streak_to_reset(&self) -> u32 {
        self.miss_streak_to_reset
    }

    /// Multiplier earned by a combo of `combo_count`.
    #[inline]
    #[must_use]
    pub fn multiplier_for(&self, combo_count: u32) -> f32 {
        (NEUTRAL_MULTIPLIER + combo_count as f32 * self.multiplier_increment)
            .min(self.max_multiplier)
    }
}

impl Default for ComboRules {
    fn default() -> Self {
        Self {
            max_multiplier: 2.0,
            multiplier_increment: 0.1,
            miss_streak_to_reset: 2,
        }
    }
}

/// Observable combo state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComboState {
    /// No combo.
    Neutral,
    /// Combo growing, no recent misses.
    Building,
    /// Combo alive but some misses since the last rhythm hit.
    AtRisk,
}

impl ComboState {
    /// Short name for logs and UI.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Neutral => "NEUTRAL",
            Self::Building => "BUILDING",
            Self::AtRisk => "AT_RISK",
        }
    }
}

/// Combo state machine for one combatant.
///
/// Lives for the combatant's whole session; it is reset, never destroyed
/// mid-match.
#[derive(Clone, Debug)]
pub struct ComboTracker {
    /// Tuning.
    rules: ComboRules,
    /// Consecutive rhythm hits.
    combo_count: u32,
    /// Consecutive misses since the last rhythm hit.
    miss_streak: u32,
    /// Highest combo reached since creation or last reset.
    best_combo: u32,
}

impl ComboTracker {
    /// Creates a tracker in the neutral state.
    #[must_use]
    pub fn new(rules: ComboRules) -> Self {
        Self {
            rules,
            combo_count: 0,
            miss_streak: 0,
            best_combo: 0,
        }
    }

    /// Registers an on-beat hit. Returns the new state.
    pub fn on_rhythm_hit(&mut self) -> ComboState {
        self.combo_count = self.combo_count.saturating_add(1);
        self.miss_streak = 0;
        self.best_combo = self.best_combo.max(self.combo_count);
        ComboState::Building
    }

    /// Registers a miss. Returns the new state.
    ///
    /// The combo survives until the miss streak reaches the reset threshold.
    pub fn on_miss(&mut self) -> ComboState {
        self.miss_streak = self.miss_streak.saturating_add(1);
        if self.miss_streak >= self.rules.miss_streak_to_reset {
            if self.combo_count > 0 {
                tracing::debug!(
                    "Combo broken at {} after {} misses",
                    self.combo_count,
                    self.miss_streak
                );
            }
            self.combo_count = 0;
            self.miss_streak = 0;
        }
        self.state()
    }

    /// Current damage multiplier. Pure read.
    #[inline]
    #[must_use]
    pub fn current_multiplier(&self) -> f32 {
        self.rules.multiplier_for(self.combo_count)
    }

    /// Current state, derived from the counters.
    #[must_use]
    pub fn state(&self) -> ComboState {
        if self.combo_count == 0 {
            ComboState::Neutral
        } else if self.miss_streak == 0 {
            ComboState::Building
        } else {
            ComboState::AtRisk
        }
    }

    /// Consecutive rhythm hits.
    #[inline]
    #[must_use]
    pub fn combo_count(&self) -> u32 {
        self.combo_count
    }

    /// Consecutive misses since the last rhythm hit.
    #[inline]
    #[must_use]
    pub fn miss_streak(&self) -> u32 {
        self.miss_streak
    }

    /// Highest combo reached since creation or the last reset.
    #[inline]
    #[must_use]
    pub fn best_combo(&self) -> u32 {
        self.best_combo
    }

    /// Returns the tuning.
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &ComboRules {
        &self.rules
    }

    /// Returns to neutral (round start).
    pub fn reset(&mut self) {
        self.combo_count = 0;
        self.miss_streak = 0;
        self.best_combo = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(max: f32, inc: f32, reset: u32) -> ComboRules {
        ComboRules::new(max, inc, reset).unwrap()
    }

    #[test]
    fn test_starts_neutral() {
        let tracker = ComboTracker::new(ComboRules::default());
        assert_eq!(tracker.state(), ComboState::Neutral);
        assert_eq!(tracker.current_multiplier(), 1.0);
        assert_eq!(tracker.combo_count(), 0);
    }

    #[test]
    fn test_hits_then_reset_round_trip() {
        let r = rules(3.0, 0.25, 3);
        for n in 0..12u32 {
            let mut tracker = ComboTracker::new(r);
            for _ in 0..n {
                assert_eq!(tracker.on_rhythm_hit(), ComboState::Building);
            }
            let expected = (1.0 + n as f32 * 0.25).min(3.0);
            assert!((tracker.current_multiplier() - expected).abs() < 1e-6);

            for _ in 0..r.miss_streak_to_reset() {
                let _ = tracker.on_miss();
            }
            assert_eq!(tracker.combo_count(), 0);
            assert_eq!(tracker.current_multiplier(), 1.0);
            assert_eq!(tracker.state(), ComboState::Neutral);
        }
    }

    #[test]
    fn test_single_miss_is_tolerated() {
        let mut tracker = ComboTracker::new(rules(2.0, 0.1, 2));
        let _ = tracker.on_rhythm_hit();
        let _ = tracker.on_rhythm_hit();

        assert_eq!(tracker.on_miss(), ComboState::AtRisk);
        assert_eq!(tracker.combo_count(), 2);
        assert_eq!(tracker.miss_streak(), 1);
        assert!((tracker.current_multiplier() - 1.2).abs() < 1e-6);

        // A hit clears the streak and keeps building
        assert_eq!(tracker.on_rhythm_hit(), ComboState::Building);
        assert_eq!(tracker.combo_count(), 3);
        assert_eq!(tracker.miss_streak(), 0);
    }

    #[test]
    fn test_reset_exactly_at_threshold() {
        let mut tracker = ComboTracker::new(rules(2.0, 0.1, 3));
        let _ = tracker.on_rhythm_hit();
        assert_eq!(tracker.on_miss(), ComboState::AtRisk);
        assert_eq!(tracker.on_miss(), ComboState::AtRisk);
        assert_eq!(tracker.combo_count(), 1);
        assert_eq!(tracker.on_miss(), ComboState::Neutral);
        assert_eq!(tracker.combo_count(), 0);
    }

    #[test]
    fn test_threshold_of_one_resets_on_first_miss() {
        let mut tracker = ComboTracker::new(rules(2.0, 0.1, 1));
        let _ = tracker.on_rhythm_hit();
        assert_eq!(tracker.on_miss(), ComboState::Neutral);
    }

    #[test]
    fn test_multiplier_capped() {
        let mut tracker = ComboTracker::new(rules(1.5, 0.2, 2));
        for _ in 0..10 {
            let _ = tracker.on_rhythm_hit();
        }
        assert_eq!(tracker.current_multiplier(), 1.5);
        assert_eq!(tracker.combo_count(), 10);
    }

    #[test]
    fn test_best_combo_and_reset() {
        let mut tracker = ComboTracker::new(rules(2.0, 0.1, 1));
        for _ in 0..4 {
            let _ = tracker.on_rhythm_hit();
        }
        let _ = tracker.on_miss();
        let _ = tracker.on_rhythm_hit();
        assert_eq!(tracker.best_combo(), 4);
        assert_eq!(tracker.combo_count(), 1);

        tracker.reset();
        assert_eq!(tracker.best_combo(), 0);
        assert_eq!(tracker.state(), ComboState::Neutral);
    }

    #[test]
    fn test_current_multiplier_has_no_side_effects() {
        let mut tracker = ComboTracker::new(ComboRules::default());
        let _ = tracker.on_rhythm_hit();
        let first = tracker.current_multiplier();
        for _ in 0..100 {
            assert_eq!(tracker.current_multiplier(), first);
        }
        assert_eq!(tracker.combo_count(), 1);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        assert_eq!(
            ComboRules::new(0.5, 0.1, 2),
            Err(ConfigError::InvalidMaxMultiplier(0.5))
        );
        assert_eq!(
            ComboRules::new(2.0, -0.1, 2),
            Err(ConfigError::InvalidIncrement(-0.1))
        );
        assert_eq!(ComboRules::new(2.0, 0.1, 0), Err(ConfigError::ZeroMissStreak));
    }
}
