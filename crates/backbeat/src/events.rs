//! # BACKBEAT Event System
//!
//! Outbound notifications for presentation collaborators (beat pulses,
//! hit flashes, combo counters).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  beat channel   ┌──────────────────┐
//! │              │────────────────>│  note lanes, UI  │
//! │ RhythmEngine │                 └──────────────────┘
//! │              │ combat channel  ┌──────────────────┐
//! │              │────────────────>│ hit fx, combo UI │
//! └──────────────┘                 └──────────────────┘
//! ```
//!
//! Channels are bounded. When a consumer falls behind, new events are
//! dropped rather than blocking the tick.

use backbeat_core::{BeatTiming, CombatantId, ComboState};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Events emitted by the rhythm engine.
#[derive(Clone, Debug, PartialEq)]
pub enum RhythmEvent {
    // =========================================================================
    // Beat Events (beat channel)
    // =========================================================================
    /// A beat boundary was crossed. Fires exactly once per boundary.
    BeatOccurred {
        /// Beat index since the music started.
        beat_index: i64,
        /// Clock time of the boundary.
        time: f64,
    },

    // =========================================================================
    // Combat Events (combat channel)
    // =========================================================================
    /// An attack was thrown and its timing judged.
    AttackJudged {
        /// Who attacked.
        attacker: CombatantId,
        /// Timing at initiation.
        timing: BeatTiming,
        /// Multiplier frozen for this attack.
        multiplier: f32,
    },

    /// A landed attack's damage was resolved.
    DamageResolved {
        /// Who landed the attack.
        attacker: CombatantId,
        /// Damage before the rhythm multiplier.
        raw_damage: u32,
        /// Damage after the rhythm multiplier.
        final_damage: u32,
        /// Whether the attack was thrown on beat.
        on_beat: bool,
    },

    /// An attack ended without connecting.
    AttackWhiffed {
        /// Who whiffed.
        attacker: CombatantId,
        /// Whether the combo registered a miss.
        counted_as_miss: bool,
    },

    /// An attack marker ran out before the attack resolved.
    MarkerExpired {
        /// Whose marker expired.
        attacker: CombatantId,
    },

    /// A combo tracker was updated.
    ComboChanged {
        /// Whose combo.
        combatant: CombatantId,
        /// Combo count after the update.
        combo_count: u32,
        /// Multiplier after the update.
        multiplier: f32,
        /// State after the update.
        state: ComboState,
    },
}

/// Bounded channel carrying [`RhythmEvent`]s.
pub struct EventBus {
    /// Sender end - held by the engine.
    sender: Sender<RhythmEvent>,
    /// Receiver end - held by consumers.
    receiver: Receiver<RhythmEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum events in flight before new ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle (clone for multiple consumers).
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<RhythmEvent>,
}

impl EventSender {
    /// Sends an event without blocking.
    ///
    /// Returns `false` if the channel is full or every receiver is gone;
    /// the event is dropped.
    #[inline]
    pub fn send(&self, event: RhythmEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!("Event channel full, dropping {:?}", dropped);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<RhythmEvent>,
}

impl EventReceiver {
    /// Receives all pending events without blocking.
    #[inline]
    pub fn drain(&self) -> Vec<RhythmEvent> {
        self.receiver.try_iter().collect()
    }

    /// Receives one event without blocking.
    #[inline]
    pub fn try_recv(&self) -> Option<RhythmEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

/// Beat and combat channels for one engine.
pub struct EventSystem {
    /// Sender for beat boundaries.
    pub beat_sender: EventSender,
    /// Receiver for beat boundaries.
    pub beat_receiver: EventReceiver,
    /// Sender for attack, damage and combo events.
    pub combat_sender: EventSender,
    /// Receiver for attack, damage and combo events.
    pub combat_receiver: EventReceiver,
}

impl EventSystem {
    /// Creates both channels with the given capacity each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let beats = EventBus::new(capacity);
        let combat = EventBus::new(capacity);
        Self {
            beat_sender: beats.sender(),
            beat_receiver: beats.receiver(),
            combat_sender: combat.sender(),
            combat_receiver: combat.receiver(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_send_receive() {
        let bus = EventBus::new(8);
        let sender = bus.sender();
        let receiver = bus.receiver();

        assert!(sender.send(RhythmEvent::BeatOccurred {
            beat_index: 3,
            time: 1.5
        }));
        assert!(receiver.has_events());

        match receiver.try_recv() {
            Some(RhythmEvent::BeatOccurred { beat_index, .. }) => assert_eq!(beat_index, 3),
            other => panic!("wrong event: {other:?}"),
        }
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_channel_drops() {
        let bus = EventBus::new(2);
        let sender = bus.sender();
        let receiver = bus.receiver();

        for attacker in 0..2 {
            assert!(sender.send(RhythmEvent::MarkerExpired {
                attacker: CombatantId::new(attacker)
            }));
        }
        assert!(!sender.send(RhythmEvent::MarkerExpired {
            attacker: CombatantId::new(9)
        }));
        assert_eq!(receiver.pending_count(), 2);
    }

    #[test]
    fn test_event_drain() {
        let system = EventSystem::new(64);
        for i in 0..10 {
            let _ = system.beat_sender.send(RhythmEvent::BeatOccurred {
                beat_index: i,
                time: i as f64 * 0.5,
            });
        }

        let events = system.beat_receiver.drain();
        assert_eq!(events.len(), 10);
        assert!(!system.beat_receiver.has_events());
        assert!(!system.combat_receiver.has_events());
    }
}
