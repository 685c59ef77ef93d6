//! # BACKBEAT Rhythm Engine
//!
//! Per-tick orchestration, called once per simulation frame by the host:
//!
//! ```text
//! Tick N (now = audio clock sample):
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. CLOCK                                                            │
//! │    └─ Advance song position, emit one BeatOccurred per boundary     │
//! │                                                                     │
//! │ 2. EXPIRY                                                           │
//! │    └─ Drop markers past their lifetime (no combo side effects)      │
//! │                                                                     │
//! │ 3. ATTACKS (every registered combatant, ascending id)               │
//! │    ├─ Sample AttackState from the fight simulation                  │
//! │    ├─ Initiation -> judge timing, freeze multiplier                 │
//! │    ├─ Landing    -> apply multiplier, update combo, write damage    │
//! │    └─ Whiff      -> resolve per whiff policy                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expiry runs before new initiations so a marker never survives a tick
//! past its lifetime.

use backbeat_core::{BeatClock, BeatTiming, CombatantId, HitWindowClassifier};

use crate::config::RhythmConfig;
use crate::error::RhythmResult;
use crate::events::{EventSystem, RhythmEvent};
use crate::fight::FightSimulation;
use crate::sync::{AttackSynchronizer, BeatContext, Observation, Resolution};

/// Resync corrections above this are logged as warnings.
pub const RESYNC_WARN_SECONDS: f64 = 0.05;

/// What happened during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Beat boundaries crossed.
    pub beats: u32,
    /// Attacks initiated.
    pub initiated: u32,
    /// Attacks initiated inside the hit window.
    pub initiated_on_beat: u32,
    /// Attacks landed (with or without a live marker).
    pub landed: u32,
    /// Landed attacks that were judged on beat.
    pub landed_on_beat: u32,
    /// Attacks resolved as whiffs.
    pub whiffed: u32,
    /// Markers dropped unresolved.
    pub expired: u32,
    /// Raw damage of landed attacks.
    pub raw_damage: u64,
    /// Final damage of landed attacks.
    pub final_damage: u64,
    /// Events dropped because a channel was full.
    pub events_dropped: u32,
}

/// The rhythm engine for one match.
///
/// Owns the beat clock, the hit window, the synchronizer (and through it
/// every combo tracker and marker) and the outbound event channels.
pub struct RhythmEngine {
    /// The match clock.
    clock: BeatClock,
    /// The hit window.
    classifier: HitWindowClassifier,
    /// Attack lifecycle bridge.
    sync: AttackSynchronizer,
    /// Outbound events.
    events: EventSystem,
    /// Accumulated statistics.
    stats: EngineStats,
    /// Reused each tick to iterate combatants without allocating.
    scratch: Vec<CombatantId>,
}

impl RhythmEngine {
    /// Builds an engine from a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid configuration value. An engine is never
    /// built from an invalid configuration.
    pub fn new(config: &RhythmConfig) -> RhythmResult<Self> {
        config.validate()?;
        let clock = config.build_clock()?;
        let classifier = config.build_classifier(clock.seconds_per_beat())?;
        let sync = AttackSynchronizer::new(
            config.combo_rules()?,
            config.marker_ttl_seconds,
            config.whiff_policy,
        )?;

        tracing::info!(
            "Rhythm engine ready: {} bpm, ±{:.3}s window, ttl {:.3}s, whiffs {:?}",
            config.tempo_bpm,
            config.window_seconds,
            config.marker_ttl_seconds,
            config.whiff_policy
        );

        Ok(Self {
            clock,
            classifier,
            sync,
            events: EventSystem::new(config.event_capacity),
            stats: EngineStats::new(),
            scratch: Vec::with_capacity(2),
        })
    }

    // =========================================================================
    // Music
    // =========================================================================

    /// Starts the beat clock with beat 0 at `origin`.
    pub fn start_music(&mut self, origin: f64) {
        self.clock.start(origin);
    }

    /// Stops the beat clock. Attacks thrown while stopped get no bonus.
    pub fn stop_music(&mut self) {
        self.clock.stop();
    }

    /// Changes tempo at `now`, keeping the current beat position.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the tempo is invalid or the hit
    /// window would reach half a beat at the new tempo.
    pub fn set_tempo(&mut self, tempo: f64, now: f64) -> RhythmResult<()> {
        let mut next = self.clock.clone();
        next.set_tempo(tempo, now)?;
        self.classifier.validate_for(next.seconds_per_beat())?;
        self.clock = next;
        Ok(())
    }

    /// Phase-locks the clock to the audio playback position.
    ///
    /// Returns the applied correction in seconds, or `None` if the music
    /// has not started.
    pub fn resync(&mut self, audio_position: f64, now: f64) -> Option<f64> {
        let correction = self.clock.resync(audio_position, now)?;
        if correction.abs() > RESYNC_WARN_SECONDS {
            tracing::warn!("Beat clock drifted {:.1}ms from audio", correction * 1000.0);
        }
        Some(correction)
    }

    // =========================================================================
    // Combatants
    // =========================================================================

    /// Registers a combatant (at spawn). Returns `false` if already known.
    pub fn add_combatant(&mut self, combatant: CombatantId) -> bool {
        let added = self.sync.register(combatant);
        if added {
            tracing::info!("{} joined the rhythm engine", combatant);
        }
        added
    }

    /// Removes a combatant with all of its rhythm state.
    pub fn remove_combatant(&mut self, combatant: CombatantId) -> bool {
        let removed = self.sync.remove(combatant);
        if removed {
            tracing::info!("{} left the rhythm engine", combatant);
        }
        removed
    }

    /// Resets every combo and drops every marker (round start).
    pub fn reset_round(&mut self) {
        self.sync.reset_all();
        tracing::info!("Round reset: all combos cleared");
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Runs one tick at clock time `now`.
    pub fn tick<S>(&mut self, sim: &mut S, now: f64) -> TickReport
    where
        S: FightSimulation + ?Sized,
    {
        let mut report = TickReport::default();

        // 1. Clock
        for beat in self.clock.advance(now) {
            report.beats += 1;
            self.emit_beat(
                RhythmEvent::BeatOccurred {
                    beat_index: beat.index,
                    time: beat.time,
                },
                &mut report,
            );
        }

        // 2. Expiry
        for marker in self.sync.tick(now) {
            report.expired += 1;
            self.emit_combat(
                RhythmEvent::MarkerExpired {
                    attacker: marker.attacker,
                },
                &mut report,
            );
        }

        // 3. Attacks
        let mut combatants = std::mem::take(&mut self.scratch);
        combatants.clear();
        combatants.extend(self.sync.combatants());

        for &combatant in &combatants {
            let Some(state) = sim.attack_state(combatant) else {
                continue;
            };
            let beat = BeatContext::new(&self.clock, &self.classifier);
            let observation = self.sync.observe(combatant, state, now, &beat);
            self.dispatch(sim, observation, &mut report);
        }

        self.scratch = combatants;
        self.stats.record(&report);
        report
    }

    /// Turns an observation into damage callbacks and events.
    fn dispatch<S>(&mut self, sim: &mut S, observation: Observation, report: &mut TickReport)
    where
        S: FightSimulation + ?Sized,
    {
        if let Some(marker) = observation.initiated {
            report.initiated += 1;
            if marker.was_on_beat() {
                report.initiated_on_beat += 1;
            }
            self.emit_combat(
                RhythmEvent::AttackJudged {
                    attacker: marker.attacker,
                    timing: marker.timing,
                    multiplier: marker.multiplier_snapshot,
                },
                report,
            );
        }

        match observation.resolved {
            Some(Resolution::Landed(hit)) => {
                report.landed += 1;
                report.raw_damage += u64::from(hit.raw_damage);
                report.final_damage += u64::from(hit.final_damage);
                sim.apply_damage(hit.attacker, hit.final_damage);

                self.emit_combat(
                    RhythmEvent::DamageResolved {
                        attacker: hit.attacker,
                        raw_damage: hit.raw_damage,
                        final_damage: hit.final_damage,
                        on_beat: hit.was_on_beat(),
                    },
                    report,
                );
                if let Some(judgement) = hit.judgement {
                    if judgement.on_beat {
                        report.landed_on_beat += 1;
                    }
                    self.emit_combat(
                        RhythmEvent::ComboChanged {
                            combatant: hit.attacker,
                            combo_count: judgement.combo_count,
                            multiplier: judgement.next_multiplier,
                            state: judgement.combo_state,
                        },
                        report,
                    );
                }
            }
            Some(Resolution::Whiffed(whiff)) => {
                report.whiffed += 1;
                self.emit_combat(
                    RhythmEvent::AttackWhiffed {
                        attacker: whiff.attacker,
                        counted_as_miss: whiff.counted_as_miss,
                    },
                    report,
                );
                if whiff.counted_as_miss {
                    self.emit_combat(
                        RhythmEvent::ComboChanged {
                            combatant: whiff.attacker,
                            combo_count: whiff.combo_count,
                            multiplier: self.sync.current_multiplier(whiff.attacker),
                            state: whiff.combo_state,
                        },
                        report,
                    );
                }
            }
            None => {}
        }
    }

    fn emit_beat(&self, event: RhythmEvent, report: &mut TickReport) {
        if !self.events.beat_sender.send(event) {
            report.events_dropped += 1;
        }
    }

    fn emit_combat(&self, event: RhythmEvent, report: &mut TickReport) {
        if !self.events.combat_sender.send(event) {
            report.events_dropped += 1;
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether "now" (as of the last tick) is inside the hit window.
    #[must_use]
    pub fn is_on_beat_now(&self) -> bool {
        self.beat_timing_now().is_on_beat()
    }

    /// Timing of "now" (as of the last tick).
    #[must_use]
    pub fn beat_timing_now(&self) -> BeatTiming {
        BeatContext::new(&self.clock, &self.classifier).timing()
    }

    /// Current multiplier of a combatant (1.0 if unknown).
    #[must_use]
    pub fn current_multiplier(&self, combatant: CombatantId) -> f32 {
        self.sync.current_multiplier(combatant)
    }

    /// The match clock, for presentation collaborators.
    #[must_use]
    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    /// The hit window.
    #[must_use]
    pub fn classifier(&self) -> &HitWindowClassifier {
        &self.classifier
    }

    /// Read-only access to combos and markers.
    #[must_use]
    pub fn synchronizer(&self) -> &AttackSynchronizer {
        &self.sync
    }

    /// Outbound event channels.
    #[must_use]
    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    /// Accumulated statistics.
    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

/// Accumulator for engine statistics.
#[derive(Clone, Debug, Default)]
pub struct EngineStats {
    /// Ticks recorded.
    pub ticks: u64,
    /// Beat boundaries crossed.
    pub beats: u64,
    /// Attacks initiated.
    pub attacks_initiated: u64,
    /// Attacks initiated on beat.
    pub attacks_on_beat: u64,
    /// Attacks landed.
    pub hits_landed: u64,
    /// Landed attacks judged on beat.
    pub hits_on_beat: u64,
    /// Whiffed attacks.
    pub whiffs: u64,
    /// Markers that expired unresolved.
    pub markers_expired: u64,
    /// Raw damage of landed attacks.
    pub raw_damage: u64,
    /// Final damage of landed attacks.
    pub final_damage: u64,
    /// Events dropped on full channels.
    pub events_dropped: u64,
}

impl EngineStats {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one tick.
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.beats += u64::from(report.beats);
        self.attacks_initiated += u64::from(report.initiated);
        self.attacks_on_beat += u64::from(report.initiated_on_beat);
        self.hits_landed += u64::from(report.landed);
        self.hits_on_beat += u64::from(report.landed_on_beat);
        self.whiffs += u64::from(report.whiffed);
        self.markers_expired += u64::from(report.expired);
        self.raw_damage += report.raw_damage;
        self.final_damage += report.final_damage;
        self.events_dropped += u64::from(report.events_dropped);
    }

    /// Share of initiated attacks thrown on beat.
    #[must_use]
    pub fn on_beat_ratio(&self) -> f64 {
        if self.attacks_initiated == 0 {
            return 0.0;
        }
        self.attacks_on_beat as f64 / self.attacks_initiated as f64
    }

    /// Final damage over raw damage (1.0 = no rhythm bonus).
    #[must_use]
    pub fn bonus_ratio(&self) -> f64 {
        if self.raw_damage == 0 {
            return 1.0;
        }
        self.final_damage as f64 / self.raw_damage as f64
    }

    /// Prints a summary of the statistics.
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════════╗");
        println!("║                    RHYTHM ENGINE SUMMARY                         ║");
        println!("╚══════════════════════════════════════════════════════════════════╝");
        println!();
        println!("┌─ TIMING ─────────────────────────────────────────────────────────┐");
        println!("│ Ticks:              {}", self.ticks);
        println!("│ Beats:              {}", self.beats);
        println!("└──────────────────────────────────────────────────────────────────┘");
        println!();
        println!("┌─ ATTACKS ────────────────────────────────────────────────────────┐");
        println!(
            "│ Initiated:          {} ({:.1}% on beat)",
            self.attacks_initiated,
            self.on_beat_ratio() * 100.0
        );
        println!("│ Landed:             {} ({} on beat)", self.hits_landed, self.hits_on_beat);
        println!("│ Whiffed:            {}", self.whiffs);
        println!("│ Markers expired:    {}", self.markers_expired);
        println!("└──────────────────────────────────────────────────────────────────┘");
        println!();
        println!("┌─ DAMAGE ─────────────────────────────────────────────────────────┐");
        println!("│ Raw:                {}", self.raw_damage);
        println!(
            "│ Final:              {} (x{:.3})",
            self.final_damage,
            self.bonus_ratio()
        );
        if self.events_dropped > 0 {
            println!("│ Events dropped:     {}", self.events_dropped);
        }
        println!("└──────────────────────────────────────────────────────────────────┘");
    }
}
