//! # Duel Harness
//!
//! Runs a scripted 60Hz duel between two bots through the rhythm engine
//! and prints what the engine made of it.
//!
//! - "Metronome" aims most swings at the beat
//! - "Brawler" swings whenever its cooldown is up
//!
//! Bot schedules come from a seeded `ChaCha8Rng`, so every run with the
//! same seed and config is identical.
//!
//! ```text
//! cargo run --bin duel_harness -- [config.toml] [seed]
//! ```

use backbeat::{
    AttackState, BeatClock, CombatantId, FightSimulation, RhythmConfig, RhythmEngine,
    RhythmEvent,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Simulation rate.
const TICK_RATE: u32 = 60;
/// Longest match in seconds.
const MATCH_SECONDS: f64 = 90.0;
/// Starting health of each bot.
const STARTING_HP: i64 = 1_000;
/// Windup before a swing can connect.
const WINDUP_SECONDS: f64 = 0.08;
/// How long the hit flag stays up after connecting.
const CONNECTED_SECONDS: f64 = 0.12;
/// Recovery of a swing that missed.
const WHIFF_RECOVERY_SECONDS: f64 = 0.2;
/// Music starts this long after the match.
const MUSIC_DELAY_SECONDS: f64 = 1.0;

/// Where a bot is in its attack.
#[derive(Clone, Copy, Debug)]
enum Phase {
    Idle,
    Windup { until: f64, connects: bool },
    Connected { until: f64 },
    Recovery { until: f64 },
}

/// A scripted combatant.
struct Bot {
    id: CombatantId,
    name: &'static str,
    hp: i64,
    /// Chance a swing is aimed at the beat.
    accuracy: f64,
    /// Chance a swing connects.
    hit_chance: f64,
    raw_damage: u32,
    phase: Phase,
    next_swing_at: f64,
    damage_dealt: u64,
    rng: ChaCha8Rng,
}

impl Bot {
    fn new(id: u32, name: &'static str, accuracy: f64, hit_chance: f64, seed: u64) -> Self {
        Self {
            id: CombatantId::new(id),
            name,
            hp: STARTING_HP,
            accuracy,
            hit_chance,
            raw_damage: 10,
            phase: Phase::Idle,
            next_swing_at: MUSIC_DELAY_SECONDS,
            damage_dealt: 0,
            rng: ChaCha8Rng::seed_from_u64(seed ^ u64::from(id)),
        }
    }

    fn attack_state(&self) -> AttackState {
        match self.phase {
            Phase::Idle => AttackState::IDLE,
            Phase::Windup { .. } | Phase::Recovery { .. } => AttackState::swinging(self.raw_damage),
            Phase::Connected { .. } => AttackState::connected(self.raw_damage),
        }
    }

    /// Steps the attack script to `now`.
    fn update(&mut self, now: f64, clock: &BeatClock) {
        self.phase = match self.phase {
            Phase::Idle if now >= self.next_swing_at => {
                self.raw_damage = self.rng.gen_range(8..=14);
                Phase::Windup {
                    until: now + WINDUP_SECONDS,
                    connects: self.rng.gen_bool(self.hit_chance),
                }
            }
            Phase::Windup { until, connects } if now >= until => {
                if connects {
                    Phase::Connected {
                        until: now + CONNECTED_SECONDS,
                    }
                } else {
                    Phase::Recovery {
                        until: now + WHIFF_RECOVERY_SECONDS,
                    }
                }
            }
            Phase::Connected { until } | Phase::Recovery { until } if now >= until => {
                self.next_swing_at = self.plan_next_swing(now, clock);
                Phase::Idle
            }
            phase => phase,
        };
    }

    fn plan_next_swing(&mut self, now: f64, clock: &BeatClock) -> f64 {
        let earliest = now + 0.15;
        if self.rng.gen_bool(self.accuracy) {
            if let Some(beat) = next_beat_after(clock, earliest) {
                return beat + self.rng.gen_range(-0.04..0.04);
            }
        }
        earliest + self.rng.gen_range(0.1..0.8)
    }
}

/// Time of the first beat at or after `time`, if the music is playing.
fn next_beat_after(clock: &BeatClock, time: f64) -> Option<f64> {
    let mut index = clock.last_beat_index().max(0);
    loop {
        let beat = clock.time_of_beat(index)?;
        if beat >= time {
            return Some(beat);
        }
        index += 1;
    }
}

/// The two bots as the engine sees them.
struct Duel {
    bots: [Bot; 2],
}

impl Duel {
    fn bot_mut(&mut self, id: CombatantId) -> Option<&mut Bot> {
        self.bots.iter_mut().find(|bot| bot.id == id)
    }

    fn is_over(&self) -> bool {
        self.bots.iter().any(|bot| bot.hp <= 0)
    }
}

impl FightSimulation for Duel {
    fn attack_state(&self, combatant: CombatantId) -> Option<AttackState> {
        self.bots
            .iter()
            .find(|bot| bot.id == combatant)
            .map(Bot::attack_state)
    }

    fn apply_damage(&mut self, attacker: CombatantId, final_damage: u32) {
        if let Some(bot) = self.bot_mut(attacker) {
            bot.damage_dealt += u64::from(final_damage);
        }
        for bot in self.bots.iter_mut().filter(|bot| bot.id != attacker) {
            bot.hp -= i64::from(final_damage);
        }
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match RhythmConfig::from_toml_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid config: {e}");
                std::process::exit(2);
            }
        },
        None => RhythmConfig::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(0xBEA7_u64);

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              BACKBEAT - SCRIPTED DUEL HARNESS                    ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ CONFIGURATION ──────────────────────────────────────────────────┐");
    println!("│ Tempo:              {} bpm", config.tempo_bpm);
    println!("│ Window:             ±{:.3}s", config.window_seconds);
    println!("│ Max multiplier:     x{:.2}", config.max_multiplier);
    println!("│ Whiff policy:       {:?}", config.whiff_policy);
    println!("│ Seed:               {seed:#x}");
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let mut engine = match RhythmEngine::new(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Engine refused config: {e}");
            std::process::exit(2);
        }
    };

    let mut duel = Duel {
        bots: [
            Bot::new(1, "Metronome", 0.85, 0.7, seed),
            Bot::new(2, "Brawler", 0.0, 0.7, seed),
        ],
    };
    for bot in &duel.bots {
        let _ = engine.add_combatant(bot.id);
    }

    let dt = 1.0 / f64::from(TICK_RATE);
    let total_ticks = (MATCH_SECONDS * f64::from(TICK_RATE)) as u64;
    let mut combo_updates = 0_u64;
    let mut music_started = false;
    let mut now = 0.0;

    for tick in 0..total_ticks {
        now = tick as f64 * dt;
        if !music_started && now >= MUSIC_DELAY_SECONDS {
            engine.start_music(MUSIC_DELAY_SECONDS);
            music_started = true;
        }

        for bot in &mut duel.bots {
            bot.update(now, engine.clock());
        }
        let _ = engine.tick(&mut duel, now);

        // Presentation side: beat pulses are dropped, combo changes counted
        let _ = engine.events().beat_receiver.drain();
        combo_updates += engine
            .events()
            .combat_receiver
            .drain()
            .iter()
            .filter(|event| matches!(event, RhythmEvent::ComboChanged { .. }))
            .count() as u64;

        if duel.is_over() {
            break;
        }
    }

    engine.stats().print_summary();
    println!();
    println!("┌─ FIGHTERS ───────────────────────────────────────────────────────┐");
    for bot in &duel.bots {
        let best = engine
            .synchronizer()
            .combo(bot.id)
            .map_or(0, backbeat::ComboTracker::best_combo);
        println!(
            "│ {:<10} hp {:>5}  dealt {:>5}  best combo {:>3}",
            bot.name,
            bot.hp.max(0),
            bot.damage_dealt,
            best
        );
    }
    println!("│ Combo updates:      {combo_updates}");
    println!("│ Match length:       {now:.2}s");
    println!("└──────────────────────────────────────────────────────────────────┘");
}
