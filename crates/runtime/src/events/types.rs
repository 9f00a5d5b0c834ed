//! Serializable event types published by the session.

use serde::{Deserialize, Serialize};

use lanefall_core::{CombatCommand, CombatOutcome, ParticipantId};

/// Topics for event routing.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Resolved commands and their effects.
    Combat,
    /// Turn lifecycle: activations and rejected commands.
    Turn,
    /// The single end-of-combat event.
    Outcome,
}

/// Event wrapper that carries the topic and typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A command was applied for the named participant.
    Command {
        participant: ParticipantId,
        command: CombatCommand,
    },
    /// A participant's turn became active.
    TurnStarted { participant: ParticipantId },
    /// A command was refused; the turn is still open.
    CommandRejected {
        participant: ParticipantId,
        reason: String,
    },
    /// The termination predicate fired.
    Ended { outcome: CombatOutcome },
}

impl SessionEvent {
    pub fn topic(&self) -> Topic {
        match self {
            SessionEvent::Command { .. } => Topic::Combat,
            SessionEvent::TurnStarted { .. } | SessionEvent::CommandRejected { .. } => Topic::Turn,
            SessionEvent::Ended { .. } => Topic::Outcome,
        }
    }
}
