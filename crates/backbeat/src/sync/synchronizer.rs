//! # Attack Synchronizer
//!
//! Owns every combatant's combo tracker and attack marker slot. Nothing
//! else may mutate them; presentation reads through the `&self` queries.
//!
//! ## Invariants
//!
//! - At most one live marker per attacker. A new initiation replaces an
//!   unconsumed marker.
//! - A marker is consumed exactly once: by landing, by whiff resolution,
//!   or by expiry. Expiry never touches the combo.
//! - Combatants are independent: one attacker's signals never read or
//!   mutate another attacker's slot.
//! - Removing a combatant drops its combo, marker and last sample together.

use std::collections::BTreeMap;

use backbeat_core::combo::NEUTRAL_MULTIPLIER;
use backbeat_core::{
    BeatClock, BeatTiming, CombatantId, ComboRules, ComboState, ComboTracker, ConfigError,
    CoreResult, HitWindowClassifier,
};

use super::marker::AttackMarker;
use super::WhiffPolicy;
use crate::fight::AttackState;

/// Read-only view of the clock and classifier used to judge initiations.
#[derive(Clone, Copy, Debug)]
pub struct BeatContext<'a> {
    /// The match clock.
    pub clock: &'a BeatClock,
    /// The hit window.
    pub classifier: &'a HitWindowClassifier,
}

impl<'a> BeatContext<'a> {
    /// Bundles a clock and classifier.
    #[must_use]
    pub const fn new(clock: &'a BeatClock, classifier: &'a HitWindowClassifier) -> Self {
        Self { clock, classifier }
    }

    /// Timing of "now" as of the clock's last sample.
    #[must_use]
    pub fn timing(&self) -> BeatTiming {
        self.classifier
            .classify_phase(self.clock.beat_phase(), self.clock.seconds_per_beat())
    }
}

/// Combo update produced when a marker is judged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Judgement {
    /// Whether the attack was thrown on beat.
    pub on_beat: bool,
    /// Multiplier that was applied (snapshot at initiation).
    pub multiplier_applied: f32,
    /// Combo state after the update.
    pub combo_state: ComboState,
    /// Combo count after the update.
    pub combo_count: u32,
    /// Multiplier the attacker's NEXT attack will snapshot.
    pub next_multiplier: f32,
}

/// Outcome of a landed attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitResolution {
    /// Who landed the attack.
    pub attacker: CombatantId,
    /// Damage before the rhythm multiplier.
    pub raw_damage: u32,
    /// Damage after the rhythm multiplier.
    pub final_damage: u32,
    /// `None` when no live marker existed: no bonus, no combo change.
    pub judgement: Option<Judgement>,
}

impl HitResolution {
    fn unjudged(attacker: CombatantId, raw_damage: u32) -> Self {
        Self {
            attacker,
            raw_damage,
            final_damage: raw_damage,
            judgement: None,
        }
    }

    /// Whether the landed attack was judged on beat.
    #[must_use]
    pub fn was_on_beat(&self) -> bool {
        self.judgement.is_some_and(|j| j.on_beat)
    }
}

/// Outcome of an attack that ended without connecting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WhiffResolution {
    /// Who whiffed.
    pub attacker: CombatantId,
    /// Whether the combo registered a miss.
    pub counted_as_miss: bool,
    /// Combo state after resolution.
    pub combo_state: ComboState,
    /// Combo count after resolution.
    pub combo_count: u32,
}

/// How an attack resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    /// The hit flag went false -> true.
    Landed(HitResolution),
    /// The attack ended without the hit flag ever being set.
    Whiffed(WhiffResolution),
}

/// Everything one sampled [`AttackState`] produced.
///
/// An initiation is always reported before a resolution from the same
/// sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Observation {
    /// Marker created by this sample.
    pub initiated: Option<AttackMarker>,
    /// Attack resolved by this sample.
    pub resolved: Option<Resolution>,
}

impl Observation {
    /// Nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.initiated.is_none() && self.resolved.is_none()
    }
}

/// Per-combatant state, dropped as a unit.
#[derive(Clone, Debug)]
struct CombatantSlot {
    combo: ComboTracker,
    marker: Option<AttackMarker>,
    previous: AttackState,
}

/// Turns attack lifecycle signals into damage multipliers and combo updates.
#[derive(Clone, Debug)]
pub struct AttackSynchronizer {
    /// Tuning for new combo trackers.
    rules: ComboRules,
    /// Marker lifetime in seconds.
    marker_ttl: f64,
    /// Whiff handling.
    whiff_policy: WhiffPolicy,
    /// Ordered for deterministic iteration.
    slots: BTreeMap<CombatantId, CombatantSlot>,
}

impl AttackSynchronizer {
    /// Creates a synchronizer with no combatants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTtl`] if `marker_ttl` is not positive.
    pub fn new(rules: ComboRules, marker_ttl: f64, whiff_policy: WhiffPolicy) -> CoreResult<Self> {
        if !marker_ttl.is_finite() || marker_ttl <= 0.0 {
            return Err(ConfigError::InvalidTtl(marker_ttl));
        }
        Ok(Self {
            rules,
            marker_ttl,
            whiff_policy,
            slots: BTreeMap::new(),
        })
    }

    // =========================================================================
    // Combatant lifecycle
    // =========================================================================

    /// Registers a combatant with a fresh combo. Returns `false` if it was
    /// already registered (its state is kept).
    pub fn register(&mut self, combatant: CombatantId) -> bool {
        if self.slots.contains_key(&combatant) {
            return false;
        }
        self.slots.insert(
            combatant,
            CombatantSlot {
                combo: ComboTracker::new(self.rules),
                marker: None,
                previous: AttackState::IDLE,
            },
        );
        true
    }

    /// Discards a combatant's combo, marker and last sample in one step.
    /// Returns `false` if it was not registered.
    pub fn remove(&mut self, combatant: CombatantId) -> bool {
        self.slots.remove(&combatant).is_some()
    }

    /// Resets every combo and drops every marker (round start).
    pub fn reset_all(&mut self) {
        for slot in self.slots.values_mut() {
            slot.combo.reset();
            slot.marker = None;
            slot.previous = AttackState::IDLE;
        }
    }

    // =========================================================================
    // Attack signals
    // =========================================================================

    /// Captures the rhythm context of a new attack.
    ///
    /// Replaces any unconsumed marker of the same attacker. Returns the new
    /// marker, or `None` if the attacker is not registered. Without timing
    /// context (music stopped) the snapshot is the neutral multiplier.
    pub fn on_attack_initiated(
        &mut self,
        attacker: CombatantId,
        now: f64,
        beat: &BeatContext<'_>,
    ) -> Option<AttackMarker> {
        let ttl = self.marker_ttl;
        let slot = self.slots.get_mut(&attacker)?;

        let timing = beat.timing();
        let multiplier = if timing == BeatTiming::NotReady {
            NEUTRAL_MULTIPLIER
        } else {
            slot.combo.current_multiplier()
        };
        let marker = AttackMarker::new(attacker, now, timing, multiplier, ttl);
        if slot.marker.replace(marker).is_some() {
            tracing::debug!("{} replaced an unresolved attack marker", attacker);
        }
        tracing::debug!(
            "{} attack initiated at {:.3}s: {:?}, multiplier x{:.2}",
            attacker,
            now,
            marker.timing,
            marker.multiplier_snapshot
        );
        Some(marker)
    }

    /// Resolves a landed attack.
    ///
    /// With a live marker the frozen multiplier is applied and the combo is
    /// updated (on-beat = rhythm hit, off-beat = miss). Without one, the raw
    /// damage passes through unchanged with no side effects; this also
    /// makes repeated calls for the same attack harmless. A marker thrown
    /// without timing context is consumed the same way.
    pub fn on_attack_landed(
        &mut self,
        attacker: CombatantId,
        raw_damage: u32,
        now: f64,
    ) -> HitResolution {
        let Some(slot) = self.slots.get_mut(&attacker) else {
            return HitResolution::unjudged(attacker, raw_damage);
        };
        let Some(marker) = slot.marker.take() else {
            tracing::debug!("{} landed with no live marker, no bonus", attacker);
            return HitResolution::unjudged(attacker, raw_damage);
        };
        if marker.is_expired(now) {
            tracing::debug!("{} landed after its marker expired, no bonus", attacker);
            return HitResolution::unjudged(attacker, raw_damage);
        }
        if !marker.has_timing() {
            tracing::debug!("{} landed an attack thrown with no beat, no bonus", attacker);
            return HitResolution::unjudged(attacker, raw_damage);
        }

        let on_beat = marker.was_on_beat();
        let combo_state = if on_beat {
            slot.combo.on_rhythm_hit()
        } else {
            slot.combo.on_miss()
        };
        let final_damage = marker.apply(raw_damage);

        tracing::debug!(
            "{} landed {} -> {} ({}, combo {})",
            attacker,
            raw_damage,
            final_damage,
            if on_beat { "on beat" } else { "off beat" },
            slot.combo.combo_count()
        );

        HitResolution {
            attacker,
            raw_damage,
            final_damage,
            judgement: Some(Judgement {
                on_beat,
                multiplier_applied: marker.multiplier_snapshot,
                combo_state,
                combo_count: slot.combo.combo_count(),
                next_multiplier: slot.combo.current_multiplier(),
            }),
        }
    }

    /// Resolves an attack that ended without connecting.
    ///
    /// Returns `None` if there was no live marker to resolve. A marker
    /// thrown without timing context is discarded without a miss.
    pub fn on_attack_whiffed(
        &mut self,
        attacker: CombatantId,
        now: f64,
    ) -> Option<WhiffResolution> {
        let slot = self.slots.get_mut(&attacker)?;
        let marker = slot.marker.take()?;
        if marker.is_expired(now) {
            return None;
        }

        let counted_as_miss = match self.whiff_policy {
            WhiffPolicy::CountAsMiss if marker.has_timing() => {
                let _ = slot.combo.on_miss();
                true
            }
            WhiffPolicy::CountAsMiss | WhiffPolicy::Ignore => false,
        };
        tracing::debug!("{} whiffed (counted as miss: {})", attacker, counted_as_miss);

        Some(WhiffResolution {
            attacker,
            counted_as_miss,
            combo_state: slot.combo.state(),
            combo_count: slot.combo.combo_count(),
        })
    }

    /// Drops every marker whose lifetime has run out. No combo side effects.
    ///
    /// Returns the dropped markers in combatant order.
    pub fn tick(&mut self, now: f64) -> Vec<AttackMarker> {
        let mut expired = Vec::new();
        for slot in self.slots.values_mut() {
            if let Some(marker) = slot.marker {
                if marker.is_expired(now) {
                    slot.marker = None;
                    tracing::debug!("{} attack marker expired unresolved", marker.attacker);
                    expired.push(marker);
                }
            }
        }
        expired
    }

    /// Feeds one sampled attack state and reacts to its edges.
    ///
    /// - entering an attack (or a new swing while still attacking) initiates
    /// - the hit flag going false -> true lands with `state.raw_damage`
    /// - a swing ending without a hit whiffs
    ///
    /// Unregistered combatants are ignored.
    pub fn observe(
        &mut self,
        combatant: CombatantId,
        state: AttackState,
        now: f64,
        beat: &BeatContext<'_>,
    ) -> Observation {
        let Some(slot) = self.slots.get_mut(&combatant) else {
            return Observation::default();
        };
        let previous = std::mem::replace(&mut slot.previous, state);

        let initiated_edge = state.attacking
            && (!previous.attacking || (previous.hit_registered && !state.hit_registered));
        let landed_edge = state.hit_registered && !previous.hit_registered;
        let whiff_edge = previous.is_swinging() && !state.attacking && !state.hit_registered;

        let mut observation = Observation::default();
        if initiated_edge {
            observation.initiated = self.on_attack_initiated(combatant, now, beat);
        }
        if landed_edge {
            observation.resolved = Some(Resolution::Landed(self.on_attack_landed(
                combatant,
                state.raw_damage,
                now,
            )));
        } else if whiff_edge {
            observation.resolved = self
                .on_attack_whiffed(combatant, now)
                .map(Resolution::Whiffed);
        }
        observation
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Combo tracker of a combatant.
    #[must_use]
    pub fn combo(&self, combatant: CombatantId) -> Option<&ComboTracker> {
        self.slots.get(&combatant).map(|slot| &slot.combo)
    }

    /// Current multiplier of a combatant (1.0 if unknown).
    #[must_use]
    pub fn current_multiplier(&self, combatant: CombatantId) -> f32 {
        self.combo(combatant)
            .map_or(NEUTRAL_MULTIPLIER, ComboTracker::current_multiplier)
    }

    /// Unresolved marker of a combatant, live or not yet swept.
    #[must_use]
    pub fn marker(&self, combatant: CombatantId) -> Option<&AttackMarker> {
        self.slots.get(&combatant).and_then(|slot| slot.marker.as_ref())
    }

    /// Whether the combatant has a marker that is still live at `now`.
    #[must_use]
    pub fn has_live_marker(&self, combatant: CombatantId, now: f64) -> bool {
        self.marker(combatant).is_some_and(|m| !m.is_expired(now))
    }

    /// Whether the combatant is registered.
    #[must_use]
    pub fn is_registered(&self, combatant: CombatantId) -> bool {
        self.slots.contains_key(&combatant)
    }

    /// Registered combatants in ascending order.
    pub fn combatants(&self) -> impl Iterator<Item = CombatantId> + '_ {
        self.slots.keys().copied()
    }

    /// Number of registered combatants.
    #[must_use]
    pub fn combatant_count(&self) -> usize {
        self.slots.len()
    }

    /// Marker lifetime in seconds.
    #[must_use]
    pub fn marker_ttl(&self) -> f64 {
        self.marker_ttl
    }

    /// Whiff handling.
    #[must_use]
    pub fn whiff_policy(&self) -> WhiffPolicy {
        self.whiff_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: CombatantId = CombatantId::new(1);
    const B: CombatantId = CombatantId::new(2);

    /// 120 bpm, 0.15s window, clock sampled at `time`.
    struct Rig {
        clock: BeatClock,
        classifier: HitWindowClassifier,
    }

    impl Rig {
        fn new() -> Self {
            let mut clock = BeatClock::new(120.0).unwrap();
            clock.start(0.0);
            let classifier = HitWindowClassifier::new(0.15, clock.seconds_per_beat()).unwrap();
            Self { clock, classifier }
        }

        fn at(&mut self, time: f64) -> BeatContext<'_> {
            let _ = self.clock.advance(time);
            BeatContext::new(&self.clock, &self.classifier)
        }
    }

    fn sync_with(policy: WhiffPolicy) -> AttackSynchronizer {
        let rules = ComboRules::new(2.0, 0.1, 2).unwrap();
        let mut sync = AttackSynchronizer::new(rules, 0.5, policy).unwrap();
        assert!(sync.register(A));
        assert!(sync.register(B));
        sync
    }

    #[test]
    fn test_invalid_ttl_rejected() {
        for ttl in [0.0, -1.0, f64::NAN] {
            let sync = AttackSynchronizer::new(ComboRules::default(), ttl, WhiffPolicy::Ignore);
            assert!(sync.is_err());
        }
    }

    #[test]
    fn test_on_beat_landing_builds_combo() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        // Phase 0.97 at 120 bpm
        let marker = sync.on_attack_initiated(A, 0.485, &rig.at(0.485)).unwrap();
        assert!(marker.was_on_beat());
        assert_eq!(marker.multiplier_snapshot, 1.0);

        let hit = sync.on_attack_landed(A, 10, 0.535);
        assert_eq!(hit.final_damage, 10);
        let judgement = hit.judgement.unwrap();
        assert!(judgement.on_beat);
        assert_eq!(judgement.combo_count, 1);
        assert!((judgement.next_multiplier - 1.1).abs() < 1e-6);
        assert!(!sync.has_live_marker(A, 0.535));
    }

    #[test]
    fn test_off_beat_landing_uses_snapshot_then_misses() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let _ = sync.on_attack_initiated(A, 0.485, &rig.at(0.485));
        let _ = sync.on_attack_landed(A, 10, 0.535);

        // Phase 0.5: off beat, snapshot is the post-hit multiplier
        let marker = sync.on_attack_initiated(A, 0.75, &rig.at(0.75)).unwrap();
        assert!(!marker.was_on_beat());
        assert!((marker.multiplier_snapshot - 1.1).abs() < 1e-6);

        let hit = sync.on_attack_landed(A, 10, 0.8);
        assert_eq!(hit.final_damage, 11);
        let judgement = hit.judgement.unwrap();
        assert!(!judgement.on_beat);
        assert_eq!(judgement.combo_state, ComboState::AtRisk);
        assert_eq!(judgement.combo_count, 1);
    }

    #[test]
    fn test_second_landing_is_idempotent() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let _ = sync.on_attack_initiated(A, 0.485, &rig.at(0.485));
        let first = sync.on_attack_landed(A, 10, 0.5);
        assert!(first.judgement.is_some());
        let combo_after_first = sync.combo(A).unwrap().combo_count();

        let second = sync.on_attack_landed(A, 10, 0.51);
        assert_eq!(second.final_damage, 10);
        assert!(second.judgement.is_none());
        assert_eq!(sync.combo(A).unwrap().combo_count(), combo_after_first);
    }

    #[test]
    fn test_landing_without_initiation_passes_raw_damage() {
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);
        let hit = sync.on_attack_landed(A, 42, 1.0);
        assert_eq!(hit.final_damage, 42);
        assert!(hit.judgement.is_none());
        assert_eq!(sync.combo(A).unwrap().state(), ComboState::Neutral);

        let unknown = sync.on_attack_landed(CombatantId::new(99), 7, 1.0);
        assert_eq!(unknown.final_damage, 7);
    }

    #[test]
    fn test_marker_expiry_has_no_combo_side_effect() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let _ = sync.on_attack_initiated(A, 1.0, &rig.at(1.0));
        assert!(sync.tick(1.49).is_empty());
        assert!(sync.has_live_marker(A, 1.49));

        let expired = sync.tick(1.5);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].attacker, A);
        assert!(sync.marker(A).is_none());

        let combo = sync.combo(A).unwrap();
        assert_eq!(combo.combo_count(), 0);
        assert_eq!(combo.miss_streak(), 0);

        // A late landing gets no bonus
        assert!(sync.on_attack_landed(A, 10, 1.6).judgement.is_none());
    }

    #[test]
    fn test_expired_but_unswept_marker_gives_no_bonus() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);
        let _ = sync.on_attack_initiated(A, 1.0, &rig.at(1.0));

        let hit = sync.on_attack_landed(A, 10, 1.7);
        assert!(hit.judgement.is_none());
        assert_eq!(sync.combo(A).unwrap().miss_streak(), 0);
    }

    #[test]
    fn test_new_initiation_replaces_marker() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let _ = sync.on_attack_initiated(A, 0.75, &rig.at(0.75));
        let second = sync.on_attack_initiated(A, 0.99, &rig.at(0.99)).unwrap();
        assert_eq!(sync.marker(A), Some(&second));
        assert!(second.was_on_beat());

        let hit = sync.on_attack_landed(A, 10, 1.0);
        assert!(hit.was_on_beat());
        assert!(sync.marker(A).is_none());
    }

    #[test]
    fn test_attackers_are_independent() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let beat = rig.at(0.49);
        let _ = sync.on_attack_initiated(A, 0.49, &beat);
        let _ = sync.on_attack_initiated(B, 0.49, &beat);

        let _ = sync.on_attack_landed(A, 10, 0.5);
        assert!(sync.marker(B).is_some());
        assert_eq!(sync.combo(B).unwrap().combo_count(), 0);
        assert_eq!(sync.combo(A).unwrap().combo_count(), 1);
    }

    #[test]
    fn test_not_ready_clock_never_on_beat() {
        let clock = BeatClock::new(120.0).unwrap();
        let classifier = HitWindowClassifier::new(0.15, clock.seconds_per_beat()).unwrap();
        let beat = BeatContext::new(&clock, &classifier);
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let marker = sync.on_attack_initiated(A, 0.0, &beat).unwrap();
        assert_eq!(marker.timing, BeatTiming::NotReady);
        let hit = sync.on_attack_landed(A, 10, 0.1);
        assert!(!hit.was_on_beat());
        assert!(hit.judgement.is_none());
        assert_eq!(sync.combo(A).unwrap().miss_streak(), 0);
    }

    #[test]
    fn test_stopped_clock_keeps_combo_and_gives_no_bonus() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);
        let _ = sync.on_attack_initiated(A, 0.485, &rig.at(0.485));
        let _ = sync.on_attack_landed(A, 10, 0.535);
        assert!((sync.current_multiplier(A) - 1.1).abs() < 1e-6);

        rig.clock.stop();
        let stopped = BeatContext::new(&rig.clock, &rig.classifier);

        let marker = sync.on_attack_initiated(A, 0.7, &stopped).unwrap();
        assert!(!marker.has_timing());
        assert_eq!(marker.multiplier_snapshot, 1.0);
        let hit = sync.on_attack_landed(A, 10, 0.75);
        assert_eq!(hit.final_damage, 10);
        assert!(hit.judgement.is_none());

        let _ = sync.on_attack_initiated(A, 0.9, &stopped);
        let whiff = sync.on_attack_whiffed(A, 1.0).unwrap();
        assert!(!whiff.counted_as_miss);
        assert!(sync.marker(A).is_none());

        let combo = sync.combo(A).unwrap();
        assert_eq!(combo.combo_count(), 1);
        assert_eq!(combo.miss_streak(), 0);
        assert_eq!(combo.state(), ComboState::Building);
    }

    #[test]
    fn test_whiff_policies() {
        let mut rig = Rig::new();

        let mut counting = sync_with(WhiffPolicy::CountAsMiss);
        let _ = counting.on_attack_initiated(A, 0.49, &rig.at(0.49));
        let whiff = counting.on_attack_whiffed(A, 0.6).unwrap();
        assert!(whiff.counted_as_miss);
        assert_eq!(counting.combo(A).unwrap().miss_streak(), 1);
        assert!(counting.on_attack_whiffed(A, 0.61).is_none());

        let mut ignoring = sync_with(WhiffPolicy::Ignore);
        let _ = ignoring.on_attack_initiated(A, 0.49, &rig.at(0.49));
        let whiff = ignoring.on_attack_whiffed(A, 0.6).unwrap();
        assert!(!whiff.counted_as_miss);
        assert_eq!(ignoring.combo(A).unwrap().miss_streak(), 0);
        assert!(ignoring.marker(A).is_none());
    }

    #[test]
    fn test_observe_edges() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let idle = sync.observe(A, AttackState::IDLE, 0.4, &rig.at(0.4));
        assert!(idle.is_empty());

        let start = sync.observe(A, AttackState::swinging(10), 0.49, &rig.at(0.49));
        assert!(start.initiated.is_some());
        assert!(start.resolved.is_none());

        // Still swinging: no new marker
        let hold = sync.observe(A, AttackState::swinging(10), 0.5, &rig.at(0.5));
        assert!(hold.is_empty());

        let land = sync.observe(A, AttackState::connected(10), 0.52, &rig.at(0.52));
        match land.resolved {
            Some(Resolution::Landed(hit)) => {
                assert_eq!(hit.final_damage, 10);
                assert!(hit.was_on_beat());
            }
            other => panic!("expected landing, got {other:?}"),
        }

        // Hit flag stays up: landing is not repeated
        let stay = sync.observe(A, AttackState::connected(10), 0.55, &rig.at(0.55));
        assert!(stay.is_empty());

        let end = sync.observe(A, AttackState::IDLE, 0.6, &rig.at(0.6));
        assert!(end.is_empty());
        assert_eq!(sync.combo(A).unwrap().combo_count(), 1);
    }

    #[test]
    fn test_observe_instant_hit_initiates_then_lands() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let both = sync.observe(A, AttackState::connected(20), 0.99, &rig.at(0.99));
        assert!(both.initiated.is_some());
        assert!(matches!(both.resolved, Some(Resolution::Landed(hit)) if hit.judgement.is_some()));
    }

    #[test]
    fn test_observe_chained_swing_and_whiff() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let _ = sync.observe(A, AttackState::swinging(10), 0.49, &rig.at(0.49));
        let _ = sync.observe(A, AttackState::connected(10), 0.5, &rig.at(0.5));

        // Hit flag drops while still attacking: a new swing
        let chained = sync.observe(A, AttackState::swinging(12), 0.75, &rig.at(0.75));
        assert!(chained.initiated.is_some());

        let whiff = sync.observe(A, AttackState::IDLE, 0.9, &rig.at(0.9));
        assert!(matches!(
            whiff.resolved,
            Some(Resolution::Whiffed(w)) if w.counted_as_miss
        ));
        assert_eq!(sync.combo(A).unwrap().state(), ComboState::AtRisk);
    }

    #[test]
    fn test_remove_discards_everything() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);

        let _ = sync.observe(A, AttackState::swinging(10), 0.49, &rig.at(0.49));
        let _ = sync.observe(A, AttackState::connected(10), 0.5, &rig.at(0.5));
        let _ = sync.observe(A, AttackState::swinging(10), 0.99, &rig.at(0.99));

        assert!(sync.remove(A));
        assert!(!sync.is_registered(A));
        assert!(sync.combo(A).is_none());
        assert!(sync.marker(A).is_none());
        assert!(!sync.remove(A));

        // Re-spawn starts clean, previous sample included
        assert!(sync.register(A));
        assert_eq!(sync.combo(A).unwrap().combo_count(), 0);
        let again = sync.observe(A, AttackState::swinging(10), 1.0, &rig.at(1.0));
        assert!(again.initiated.is_some());
    }

    #[test]
    fn test_reset_all() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);
        let _ = sync.on_attack_initiated(A, 0.49, &rig.at(0.49));
        let _ = sync.on_attack_landed(A, 10, 0.5);
        let _ = sync.on_attack_initiated(B, 0.6, &rig.at(0.6));

        sync.reset_all();
        assert_eq!(sync.combo(A).unwrap().combo_count(), 0);
        assert!(sync.marker(B).is_none());
        assert_eq!(sync.combatant_count(), 2);
    }

    #[test]
    fn test_register_twice_keeps_state() {
        let mut rig = Rig::new();
        let mut sync = sync_with(WhiffPolicy::CountAsMiss);
        let _ = sync.on_attack_initiated(A, 0.49, &rig.at(0.49));
        let _ = sync.on_attack_landed(A, 10, 0.5);

        assert!(!sync.register(A));
        assert_eq!(sync.combo(A).unwrap().combo_count(), 1);
        assert_eq!(sync.combatants().collect::<Vec<_>>(), vec![A, B]);
    }
}
