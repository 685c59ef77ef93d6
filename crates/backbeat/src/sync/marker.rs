//! # Attack Marker
//!
//! Short-lived record of the rhythm context at the moment an attack was
//! thrown. Consumed when the attack lands or whiffs, or dropped when its
//! lifetime runs out.

use backbeat_core::{BeatTiming, CombatantId};

/// Rhythm context frozen at attack initiation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackMarker {
    /// Who threw the attack.
    pub attacker: CombatantId,
    /// Clock time of initiation.
    pub created_at: f64,
    /// Timing classification at initiation.
    pub timing: BeatTiming,
    /// Multiplier of the attacker's combo at initiation.
    pub multiplier_snapshot: f32,
    /// Lifetime in seconds.
    pub ttl_seconds: f64,
}

impl AttackMarker {
    /// Creates a marker.
    #[must_use]
    pub const fn new(
        attacker: CombatantId,
        created_at: f64,
        timing: BeatTiming,
        multiplier_snapshot: f32,
        ttl_seconds: f64,
    ) -> Self {
        Self {
            attacker,
            created_at,
            timing,
            multiplier_snapshot,
            ttl_seconds,
        }
    }

    /// Whether the attack was thrown inside the hit window.
    #[inline]
    #[must_use]
    pub fn was_on_beat(&self) -> bool {
        self.timing.is_on_beat()
    }

    /// Whether the clock had timing context when the attack was thrown.
    ///
    /// Markers without context never carry a bonus and never judge the combo.
    #[inline]
    #[must_use]
    pub fn has_timing(&self) -> bool {
        self.timing != BeatTiming::NotReady
    }

    /// Clock time at which the marker stops being live.
    #[inline]
    #[must_use]
    pub fn expires_at(&self) -> f64 {
        self.created_at + self.ttl_seconds
    }

    /// A marker is live strictly before `created_at + ttl`.
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expires_at()
    }

    /// Applies the frozen multiplier to `raw_damage`, rounding to nearest.
    #[must_use]
    pub fn apply(&self, raw_damage: u32) -> u32 {
        (f64::from(raw_damage) * f64::from(self.multiplier_snapshot)).round() as u32
    }
}
