//! Model error types.
//!
//! Setup errors are the only fatal errors the model surfaces before combat
//! starts. Resolution "failures" (miss, block, evade) are ordinary pipeline
//! branches and never appear here. Command errors reject a single command
//! and leave the combat state untouched.

use crate::state::ParticipantId;

/// Fatal configuration errors raised before combat starts.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("combat requires at least one opponent")]
    NoOpponents,

    #[error("roster must begin with the player participant")]
    PlayerNotFirst,

    #[error("participant {participant} action references unknown attack {set}/{attack}")]
    UnknownAttack {
        participant: ParticipantId,
        set: usize,
        attack: usize,
    },

    #[error("participant {participant} row {row} is outside its team range")]
    RowOutOfRange { participant: ParticipantId, row: i32 },

    #[error("custom turn order references unknown participant {0}")]
    UnknownTurnOrderParticipant(ParticipantId),
}

/// Rejection of one combat command. The command has no effect.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("combat has already ended")]
    CombatEnded,

    #[error("participant {0} does not hold the active turn")]
    NotYourTurn(ParticipantId),

    #[error("no action points left this turn")]
    OutOfActionPoints,

    #[error("no opposing participant left to target")]
    NoTarget,

    #[error("{0} is not a valid target")]
    InvalidTarget(ParticipantId),

    #[error("unknown action index {index}")]
    UnknownAction { index: usize },

    #[error("unknown attack {set}/{attack}")]
    UnknownAttack { set: usize, attack: usize },

    #[error("action {name:?} is not usable right now")]
    ActionUnusable { name: String },

    #[error("attack cannot reach the current target")]
    AttackOutOfRange,

    #[error("movement is impossible in a confined space")]
    ConfinedSpace,

    #[error("cannot move further in that direction")]
    RowBlocked,
}
