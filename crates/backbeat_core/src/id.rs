//! # Combatant Identity
//!
//! Combatants are owned by the fight simulation. The rhythm engine only
//! needs a stable, cheap key for per-combatant state.

use std::fmt;

/// Unique identifier for a combatant.
///
/// Assigned by the fight simulation; the engine never allocates these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CombatantId(u32);

impl CombatantId {
    /// Creates a combatant ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "combatant#{}", self.0)
    }
}

impl From<u32> for CombatantId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
