//! Combat event log.
//!
//! Events are pure data appended to a participant's rolling history. The
//! UI and narrator consume them; nothing in the model reads them back.

use arrayvec::ArrayVec;

use crate::config::CombatConfig;
use crate::effect::EffectKind;
use crate::state::ParticipantId;

/// One narratable thing that happened to a participant.
#[derive(Clone, Debug, PartialEq, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatEvent {
    /// An incoming attack missed.
    Missed { by: ParticipantId },
    /// An incoming attack was blocked.
    Blocked { by: ParticipantId },
    /// An incoming attack was evaded.
    Evaded { by: ParticipantId },
    /// Damage was inflicted on this participant.
    Damaged {
        by: ParticipantId,
        amount: u32,
        critical: bool,
        /// Protection absorbed the entire roll.
        protected: bool,
    },
    /// Health restored.
    Healed { amount: u32 },
    /// A status effect landed on this participant.
    EffectApplied { effect: EffectKind },
    /// The participant used a combat action.
    ActionTaken { action: String },
    /// The participant fired a raw attack.
    AttackUsed { attack: String },
    /// The participant changed rows.
    Moved { from: i32, to: i32 },
    /// The participant explicitly held its turn.
    Held,
    /// The participant fell in combat.
    Defeated,
    /// The participant gave up the encounter.
    Surrendered,
}

/// Bounded rolling history of recent events.
///
/// Capacity is [`CombatConfig::EVENT_LOG_CAP`]; the oldest entry is dropped
/// when a new one arrives at capacity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventLog {
    events: ArrayVec<CombatEvent, { CombatConfig::EVENT_LOG_CAP }>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, evicting the oldest entry when full.
    pub fn push(&mut self, event: CombatEvent) {
        if self.events.is_full() {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&CombatEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_evicts_oldest_at_capacity() {
        let mut log = EventLog::new();
        for _ in 0..CombatConfig::EVENT_LOG_CAP {
            log.push(CombatEvent::Held);
        }
        log.push(CombatEvent::Surrendered);

        assert_eq!(log.len(), CombatConfig::EVENT_LOG_CAP);
        assert_eq!(log.latest(), Some(&CombatEvent::Surrendered));
        // Oldest entry is gone, the remainder are still the holds.
        assert_eq!(
            log.iter().filter(|e| **e == CombatEvent::Held).count(),
            CombatConfig::EVENT_LOG_CAP - 1
        );
    }
}
