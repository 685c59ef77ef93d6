//! # Rhythm Engine Benchmark
//!
//! Per-tick cost of the engine at 60Hz: clock advance, expiry sweep and
//! attack edge detection for both fighters.

#![allow(missing_docs)]

use backbeat::{
    AttackState, BeatClock, CombatantId, FightSimulation, HitWindowClassifier, RhythmConfig,
    RhythmEngine,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const TICK: f64 = 1.0 / 60.0;

/// Both fighters swing for 10 ticks, connect for 5, rest for 15.
struct LoopingFight {
    frame: u64,
}

impl FightSimulation for LoopingFight {
    fn attack_state(&self, combatant: CombatantId) -> Option<AttackState> {
        let offset = u64::from(combatant.raw()) * 7;
        Some(match (self.frame + offset) % 30 {
            0..=9 => AttackState::swinging(10),
            10..=14 => AttackState::connected(10),
            _ => AttackState::IDLE,
        })
    }

    fn apply_damage(&mut self, _attacker: CombatantId, final_damage: u32) {
        black_box(final_damage);
    }
}

fn bench_clock_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("beat_clock");

    group.bench_function("advance_60hz_10k", |b| {
        b.iter(|| {
            let mut clock = BeatClock::new(128.0).unwrap();
            clock.start(0.0);
            let mut beats = 0;
            for frame in 0..10_000 {
                beats += clock.advance(frame as f64 * TICK).count();
            }
            black_box(beats)
        });
    });

    group.bench_function("classify_phase_10k", |b| {
        let classifier = HitWindowClassifier::new(0.1, 0.5).unwrap();
        b.iter(|| {
            let mut on_beat = 0;
            for i in 0..10_000 {
                let phase = f64::from(i) / 10_000.0;
                if classifier.classify(black_box(phase), 0.5).is_on_beat() {
                    on_beat += 1;
                }
            }
            black_box(on_beat)
        });
    });

    group.finish();
}

fn bench_engine_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("rhythm_engine");

    group.bench_function("tick_two_fighters_10k", |b| {
        b.iter(|| {
            let mut engine = RhythmEngine::new(&RhythmConfig::default()).unwrap();
            let _ = engine.add_combatant(CombatantId::new(1));
            let _ = engine.add_combatant(CombatantId::new(2));
            engine.start_music(0.0);

            let mut fight = LoopingFight { frame: 0 };
            for frame in 0..10_000 {
                fight.frame = frame;
                let _ = engine.tick(&mut fight, frame as f64 * TICK);
                let _ = engine.events().beat_receiver.drain();
                let _ = engine.events().combat_receiver.drain();
            }
            black_box(engine.stats().final_damage)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_clock_advance, bench_engine_tick);
criterion_main!(benches);
