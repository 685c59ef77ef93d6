//! # Attack Synchronization
//!
//! Bridges a combatant's attack lifecycle to the rhythm engine.
//!
//! ```text
//!  sampled AttackState        AttackSynchronizer              ComboTracker
//! ┌────────────────────┐    ┌───────────────────────┐      ┌─────────────┐
//! │ idle -> swinging   │───>│ marker: on-beat? x1.3 │      │             │
//! │ hit flag 0 -> 1    │───>│ damage = raw * x1.3   │─────>│ hit / miss  │
//! │ swinging -> idle   │───>│ whiff policy          │─────>│ miss?       │
//! └────────────────────┘    └───────────────────────┘      └─────────────┘
//! ```
//!
//! Exactly one damage decision per landed attack, taken when the attack
//! connects, using the timing captured when it was thrown.

pub mod marker;
pub mod synchronizer;

pub use marker::AttackMarker;
pub use synchronizer::{
    AttackSynchronizer, BeatContext, HitResolution, Judgement, Observation, Resolution,
    WhiffResolution,
};

use serde::{Deserialize, Serialize};

/// How an attack that ends without connecting affects the combo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiffPolicy {
    /// A whiff consumes the marker and counts as a miss.
    #[default]
    CountAsMiss,
    /// A whiff discards the marker without touching the combo.
    Ignore,
}
