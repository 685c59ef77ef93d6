//! # Fight Simulation Interface
//!
//! The engine never reaches into the fight simulation. The simulation
//! implements [`FightSimulation`] and the engine talks to it through that
//! trait only.
//!
//! ```text
//! Engine defines:            Fight simulation implements:
//! ┌────────────────────┐     ┌────────────────────────┐
//! │ trait FightSim...  │ ←── │ impl FightSimulation   │
//! └────────────────────┘     └────────────────────────┘
//! ```

use backbeat_core::CombatantId;

/// Attack lifecycle of one combatant, sampled once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttackState {
    /// The combatant is in an attack (windup, active or recovery).
    pub attacking: bool,
    /// The current attack has connected.
    pub hit_registered: bool,
    /// Damage the current attack deals before rhythm bonuses.
    pub raw_damage: u32,
}

impl AttackState {
    /// Not attacking.
    pub const IDLE: Self = Self {
        attacking: false,
        hit_registered: false,
        raw_damage: 0,
    };

    /// Attacking, not connected yet.
    #[must_use]
    pub const fn swinging(raw_damage: u32) -> Self {
        Self {
            attacking: true,
            hit_registered: false,
            raw_damage,
        }
    }

    /// Attacking and connected.
    #[must_use]
    pub const fn connected(raw_damage: u32) -> Self {
        Self {
            attacking: true,
            hit_registered: true,
            raw_damage,
        }
    }

    /// In an attack that has not connected yet.
    #[inline]
    #[must_use]
    pub const fn is_swinging(&self) -> bool {
        self.attacking && !self.hit_registered
    }
}

/// What the rhythm engine needs from the fight simulation.
pub trait FightSimulation {
    /// Current attack lifecycle of `combatant`.
    ///
    /// Returns `None` if the simulation does not know the combatant; the
    /// engine then skips it for this tick.
    fn attack_state(&self, combatant: CombatantId) -> Option<AttackState>;

    /// Receives the post-multiplier damage of a landed attack.
    ///
    /// Called exactly once per landed attack, in the tick the hit flag was
    /// first observed.
    fn apply_damage(&mut self, attacker: CombatantId, final_damage: u32);
}
