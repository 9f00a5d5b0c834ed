//! Combat configuration constants and tunable parameters.

use crate::state::{ParticipantId, Team, Tick};

/// Combat configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatConfig {
    /// Action points granted at the start of each turn.
    pub max_action_points: u32,

    /// Advantage bar ceiling. Advantage is clamped to `[0, max]` after
    /// every mutation.
    pub max_advantage_points: u32,
}

impl CombatConfig {
    // ===== compile-time constants used as type parameters =====
    /// Rolling window of a participant's recent turns kept for the UI.
    pub const TURN_WINDOW: usize = 8;
    /// Rolling window of a participant's recent combat events.
    pub const EVENT_LOG_CAP: usize = 10;
    /// Maximum concurrent status effects per participant.
    pub const MAX_STATUS_EFFECTS: usize = 8;
    /// Maximum passive abilities per participant.
    pub const MAX_PASSIVES: usize = 8;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_ACTION_POINTS: u32 = 3;
    pub const DEFAULT_MAX_ADVANTAGE_POINTS: u32 = 5000;

    // ===== resolution constants =====
    /// Ceiling applied to the derived evade chance.
    pub const EVADE_CHANCE_CAP: f64 = 0.95;
    /// Flat advantage granted to the receiver of a blocked particle.
    pub const BLOCK_ADVANTAGE_BASE: f64 = 150.0;
    /// Additional block advantage per point of resilience.
    pub const BLOCK_ADVANTAGE_PER_RESILIENCE: f64 = 75.0;
    /// Flat advantage granted to the receiver of an evaded particle.
    pub const EVADE_ADVANTAGE: f64 = 150.0;
    /// Bound of the random jitter applied to a participant's first turn
    /// delay (fraction of the computed delay).
    pub const INITIAL_TURN_JITTER: f64 = 0.05;

    pub fn new() -> Self {
        Self {
            max_action_points: Self::DEFAULT_MAX_ACTION_POINTS,
            max_advantage_points: Self::DEFAULT_MAX_ADVANTAGE_POINTS,
        }
    }

    /// Legal row range for a team.
    ///
    /// The lane is split at the front line: the player team holds rows
    /// `-3..=0`, the opposition `1..=6`. Row distance 1 across the split is
    /// melee engagement.
    pub fn row_range(&self, team: Team) -> std::ops::RangeInclusive<i32> {
        match team {
            Team::Player => -3..=0,
            Team::Opposition => 1..=6,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-encounter overrides supplied by the surrounding game.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatOptions {
    /// Explicit opening turn order. Each entry seeds a custom turn with the
    /// given timestamp instead of the initiative-derived initial delay.
    pub custom_turn_order: Option<Vec<(ParticipantId, Tick)>>,

    /// Confined space: movement commands are refused for everyone.
    pub confined_space: bool,

    /// Soft health floor applied to every participant. Damage cannot push
    /// health below this value; reaching it ends the encounter.
    pub health_limit: Option<u32>,
}
