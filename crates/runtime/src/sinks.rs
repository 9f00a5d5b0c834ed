//! End-of-combat collaborators.
//!
//! The session is self-contained until the termination predicate fires;
//! everything that reaches back into the surrounding game (loot,
//! experience, statistics, inventory) goes through [`OutcomeSinks`],
//! invoked exactly once.

use lanefall_core::{CombatOutcome, ParticipantReport};

/// Hooks run once after combat ends. All methods default to no-ops so
/// implementors only override what their game cares about.
pub trait OutcomeSinks: Send + Sync {
    /// The player won; distribute spoils from the fallen opposition.
    fn award_loot(&self, _outcome: &CombatOutcome) {}

    /// The player won; hand out experience for defeated opponents.
    fn award_experience(&self, _outcome: &CombatOutcome) {}

    /// Win or lose: persist per-participant combat statistics.
    fn record_statistics(&self, _outcome: &CombatOutcome) {}

    /// Return recoverable ammunition to the participant's inventory.
    fn reclaim_ammunition(&self, _report: &ParticipantReport) {}

    /// Surface a closing message to the player.
    fn notify(&self, _message: &str) {}
}

/// Sinks that do nothing. Headless sessions and tests.
pub struct NoopSinks;

impl OutcomeSinks for NoopSinks {}
