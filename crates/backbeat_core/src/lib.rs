//! # BACKBEAT Core
//!
//! The three leaf components of the rhythm engine:
//!
//! ```text
//! ┌──────────────┐   phase   ┌─────────────────────┐  on-beat?  ┌──────────────┐
//! │  BeatClock   │──────────>│ HitWindowClassifier │───────────>│ ComboTracker │
//! │  (tempo)     │           │ (window around beat)│            │ (multiplier) │
//! └──────────────┘           └─────────────────────┘            └──────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **No global clock** - each match owns exactly one [`BeatClock`]
//! 2. **One definition of "on beat"** - the continuous phase test in [`window`]
//! 3. **Derived multiplier** - the combo multiplier is computed from the combo
//!    count on every read, it is never stored
//!
//! ## Example
//!
//! ```rust
//! use backbeat_core::{BeatClock, HitWindowClassifier, ComboTracker, ComboRules};
//!
//! let mut clock = BeatClock::new(120.0).unwrap();
//! let classifier = HitWindowClassifier::new(0.15, clock.seconds_per_beat()).unwrap();
//! let mut combo = ComboTracker::new(ComboRules::default());
//!
//! clock.start(0.0);
//! let beats = clock.advance(0.485).count();
//! assert_eq!(beats, 1);
//!
//! let phase = clock.beat_phase().unwrap();
//! if classifier.is_on_beat(phase, clock.seconds_per_beat()) {
//!     combo.on_rhythm_hit();
//! }
//! assert_eq!(combo.combo_count(), 1);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod combo;
pub mod error;
pub mod id;
pub mod window;

pub use clock::{BeatClock, BeatEvents, BeatTick};
pub use combo::{ComboRules, ComboState, ComboTracker};
pub use error::{ConfigError, CoreResult};
pub use id::CombatantId;
pub use window::{BeatTiming, HitWindowClassifier};
