//! # BACKBEAT
//!
//! Rhythm-timed damage and combo engine for a two-combatant fighting game.
//!
//! Attacks thrown inside a window around the musical beat build a combo;
//! the combo raises a damage multiplier that is applied when the attack
//! lands.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!  audio clock ────> │ RhythmEngine                                 │
//!                    │  ┌───────────┐  ┌────────────────────┐       │
//!                    │  │ BeatClock │─>│ HitWindowClassifier│       │
//!                    │  └───────────┘  └─────────┬──────────┘       │
//!                    │                           v                  │
//!  FightSimulation <─┼─ damage ── ┌──────────────────────────┐      │
//!  (attack states) ──┼──────────> │ AttackSynchronizer       │      │
//!                    │            │  per combatant:          │      │
//!                    │            │   ComboTracker + marker  │      │
//!                    │            └────────────┬─────────────┘      │
//!                    └─────────────────────────┼────────────────────┘
//!                                              v
//!                                     EventSystem (beat / combat)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use backbeat::{AttackState, CombatantId, FightSimulation, RhythmConfig, RhythmEngine};
//!
//! struct Dummy {
//!     state: AttackState,
//!     dealt: u32,
//! }
//!
//! impl FightSimulation for Dummy {
//!     fn attack_state(&self, _: CombatantId) -> Option<AttackState> {
//!         Some(self.state)
//!     }
//!     fn apply_damage(&mut self, _: CombatantId, final_damage: u32) {
//!         self.dealt += final_damage;
//!     }
//! }
//!
//! let mut engine = RhythmEngine::new(&RhythmConfig::default()).unwrap();
//! let p1 = CombatantId::new(1);
//! engine.add_combatant(p1);
//! engine.start_music(0.0);
//!
//! let mut fight = Dummy { state: AttackState::swinging(10), dealt: 0 };
//! engine.tick(&mut fight, 0.49);
//! fight.state = AttackState::connected(10);
//! engine.tick(&mut fight, 0.52);
//!
//! assert_eq!(fight.dealt, 10);
//! assert!(engine.current_multiplier(p1) > 1.0);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod fight;
pub mod sync;

pub use backbeat_core::{
    BeatClock, BeatTiming, CombatantId, ComboRules, ComboState, ComboTracker, HitWindowClassifier,
};

pub use config::RhythmConfig;
pub use engine::{EngineStats, RhythmEngine, TickReport};
pub use error::{RhythmError, RhythmResult};
pub use events::{EventBus, EventReceiver, EventSender, EventSystem, RhythmEvent};
pub use fight::{AttackState, FightSimulation};
pub use sync::{AttackMarker, AttackSynchronizer, BeatContext, WhiffPolicy};
