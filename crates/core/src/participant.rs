//! Runtime combat state of one actor.

use arrayvec::ArrayVec;

use crate::action::CombatAction;
use crate::attack::AttackSet;
use crate::config::CombatConfig;
use crate::effect::EffectSet;
use crate::event::{CombatEvent, EventLog};
use crate::passive::PassiveList;
use crate::state::{Engagement, ParticipantId, Team, Tick};
use crate::turn::{turn_interval, Turn};

/// Stat line consumed from the surrounding game's actor capability.
///
/// The model owns a copy for the duration of the encounter; health changes
/// are reported back through the outcome, not written through.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorSheet {
    pub name: String,
    pub max_health: u32,
    pub health: u32,
    pub protection: f64,
    /// Turn frequency stat; higher means shorter turn intervals.
    pub speed: f64,
    /// Divides the first turn delay; higher acts sooner.
    pub initiative: f64,
    pub hit_melee_chance: f64,
    pub hit_ranged_chance: f64,
    pub evade_melee_chance: f64,
    pub evade_ranged_chance: f64,
    pub block_chance: f64,
    pub critical_hit_chance: f64,
    pub critical_hit_multiplier: f64,
    pub resilience: u32,
}

impl ActorSheet {
    /// Hit chance for the given engagement kind.
    pub fn hit_chance(&self, engagement: Engagement) -> f64 {
        match engagement {
            Engagement::Melee => self.hit_melee_chance,
            Engagement::Ranged => self.hit_ranged_chance,
        }
    }

    /// Evade chance for the given engagement kind.
    pub fn evade_chance(&self, engagement: Engagement) -> f64 {
        match engagement {
            Engagement::Melee => self.evade_melee_chance,
            Engagement::Ranged => self.evade_ranged_chance,
        }
    }
}

/// What a damage application did to the receiver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DamageTaken {
    /// Health actually removed after the health-limit floor.
    pub applied: u32,
    /// Health reached zero.
    pub defeated: bool,
    /// Health landed exactly on the soft floor.
    pub reached_limit: bool,
}

/// The runtime combat state of one actor.
///
/// Owned exclusively by the combat arena for the encounter's lifetime and
/// addressed by [`ParticipantId`]; relations to targets and opponents are
/// id lookups, never references.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Participant {
    pub id: ParticipantId,
    pub team: Team,
    pub row: i32,
    /// Automated participants act through the AI policy; the player waits
    /// for external commands.
    pub automated: bool,

    pub sheet: ActorSheet,
    pub attack_sets: Vec<AttackSet>,
    pub actions: Vec<CombatAction>,
    pub passives: PassiveList,
    pub effects: EffectSet,
    pub events: EventLog,

    action_points: u32,
    max_action_points: u32,
    advantage_points: u32,
    max_advantage_points: u32,

    /// Currently selected target, revalidated lazily against liveness.
    pub target: Option<ParticipantId>,
    /// Row of the last resolved target, the anchor for re-targeting.
    pub last_target_row: Option<i32>,

    /// Soft floor damage cannot cross.
    pub health_limit: Option<u32>,

    /// Rolling window of recently activated turns.
    turn_history: ArrayVec<Turn, { CombatConfig::TURN_WINDOW }>,

    /// Re-entrancy guard: set while an action body is executing.
    acting: bool,

    /// Cached interval between this participant's regular turns.
    pub turn_interval: Tick,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        team: Team,
        row: i32,
        automated: bool,
        sheet: ActorSheet,
        config: &CombatConfig,
    ) -> Self {
        let interval = turn_interval(sheet.speed);
        Self {
            id,
            team,
            row,
            automated,
            sheet,
            attack_sets: Vec::new(),
            actions: Vec::new(),
            passives: PassiveList::new(),
            effects: EffectSet::new(),
            events: EventLog::new(),
            action_points: config.max_action_points,
            max_action_points: config.max_action_points,
            advantage_points: 0,
            max_advantage_points: config.max_advantage_points,
            target: None,
            last_target_row: None,
            health_limit: None,
            turn_history: ArrayVec::new(),
            acting: false,
            turn_interval: interval,
        }
    }

    // ========================================================================
    // Liveness
    // ========================================================================

    pub fn is_alive(&self) -> bool {
        self.sheet.health > 0
    }

    /// Whether the participant sits exactly on its soft health floor.
    pub fn at_health_limit(&self) -> bool {
        self.health_limit
            .is_some_and(|limit| self.sheet.health <= limit)
    }

    /// Can still be scheduled and attacked.
    pub fn in_fighting_shape(&self) -> bool {
        self.is_alive() && !self.at_health_limit()
    }

    /// Applies damage against the health-limit floor.
    pub fn take_damage(&mut self, amount: u32) -> DamageTaken {
        let floor = self.health_limit.unwrap_or(0);
        let before = self.sheet.health;
        let after = before.saturating_sub(amount).max(floor.min(before));
        self.sheet.health = after;

        DamageTaken {
            applied: before - after,
            defeated: after == 0,
            reached_limit: self.health_limit == Some(after) && before > after,
        }
    }

    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.sheet.health;
        self.sheet.health = (before + amount).min(self.sheet.max_health);
        let restored = self.sheet.health - before;
        if restored > 0 {
            self.events.push(CombatEvent::Healed { amount: restored });
        }
        restored
    }

    // ========================================================================
    // Point economies
    // ========================================================================

    pub fn action_points(&self) -> u32 {
        self.action_points
    }

    pub fn spend_action_points(&mut self, cost: u32) {
        self.action_points = self.action_points.saturating_sub(cost);
    }

    pub fn exhaust_action_points(&mut self) {
        self.action_points = 0;
    }

    /// Refills the per-turn budget at turn start.
    pub fn refill_action_points(&mut self) {
        self.action_points = self.max_action_points;
    }

    pub fn advantage_points(&self) -> u32 {
        self.advantage_points
    }

    pub fn max_advantage_points(&self) -> u32 {
        self.max_advantage_points
    }

    /// Adds (possibly fractional) advantage; the stored value is always a
    /// rounded integer clamped to `[0, max]`.
    pub fn add_advantage_points(&mut self, amount: f64) {
        let next = (f64::from(self.advantage_points) + amount)
            .round()
            .clamp(0.0, f64::from(self.max_advantage_points));
        self.advantage_points = next as u32;
    }

    pub fn remove_advantage_points(&mut self, amount: f64) {
        self.add_advantage_points(-amount);
    }

    pub fn drain_advantage_points(&mut self) {
        self.advantage_points = 0;
    }

    // ========================================================================
    // Action gate
    // ========================================================================

    /// Whether a new action may start. `turn_active` is the orchestrator's
    /// knowledge of whose turn is current.
    pub fn can_act(&self, turn_active: bool) -> bool {
        turn_active && !self.acting && self.action_points > 0 && self.in_fighting_shape()
    }

    pub fn begin_action(&mut self) {
        self.acting = true;
    }

    pub fn finish_action(&mut self) {
        self.acting = false;
    }

    // ========================================================================
    // Turn history
    // ========================================================================

    pub fn record_turn(&mut self, turn: Turn) {
        if self.turn_history.is_full() {
            self.turn_history.remove(0);
        }
        self.turn_history.push(turn);
    }

    pub fn turn_history(&self) -> &[Turn] {
        &self.turn_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(health: u32) -> ActorSheet {
        ActorSheet {
            name: "test".into(),
            max_health: health,
            health,
            protection: 0.0,
            speed: 2.0,
            initiative: 1.0,
            hit_melee_chance: 0.8,
            hit_ranged_chance: 0.7,
            evade_melee_chance: 0.2,
            evade_ranged_chance: 0.1,
            block_chance: 0.1,
            critical_hit_chance: 0.05,
            critical_hit_multiplier: 2.0,
            resilience: 1,
        }
    }

    fn participant(health: u32) -> Participant {
        Participant::new(
            ParticipantId(1),
            Team::Opposition,
            1,
            true,
            sheet(health),
            &CombatConfig::default(),
        )
    }

    #[test]
    fn advantage_clamps_and_rounds() {
        let mut p = participant(100);
        p.add_advantage_points(100.4);
        assert_eq!(p.advantage_points(), 100);

        p.add_advantage_points(1e9);
        assert_eq!(
            p.advantage_points(),
            CombatConfig::DEFAULT_MAX_ADVANTAGE_POINTS
        );

        p.remove_advantage_points(1e9);
        assert_eq!(p.advantage_points(), 0);
    }

    #[test]
    fn advantage_add_remove_round_trips() {
        let mut p = participant(100);
        p.add_advantage_points(1200.0);
        p.add_advantage_points(333.3);
        p.remove_advantage_points(333.3);
        assert_eq!(p.advantage_points(), 1200);
    }

    #[test]
    fn action_points_never_go_negative() {
        let mut p = participant(100);
        p.spend_action_points(2);
        p.spend_action_points(5);
        assert_eq!(p.action_points(), 0);
    }

    #[test]
    fn damage_respects_health_limit_floor() {
        let mut p = participant(50);
        p.health_limit = Some(10);

        let taken = p.take_damage(100);
        assert_eq!(p.sheet.health, 10);
        assert_eq!(taken.applied, 40);
        assert!(taken.reached_limit);
        assert!(!taken.defeated);
        assert!(!p.in_fighting_shape());
    }

    #[test]
    fn damage_without_limit_defeats() {
        let mut p = participant(30);
        let taken = p.take_damage(30);
        assert!(taken.defeated);
        assert_eq!(taken.applied, 30);
    }

    #[test]
    fn heal_is_capped_at_max_health() {
        let mut p = participant(50);
        p.take_damage(20);
        assert_eq!(p.heal(100), 20);
        assert_eq!(p.sheet.health, 50);
    }

    #[test]
    fn acting_guard_blocks_reentry() {
        let mut p = participant(50);
        assert!(p.can_act(true));
        p.begin_action();
        assert!(!p.can_act(true));
        p.finish_action();
        assert!(p.can_act(true));
        assert!(!p.can_act(false));
    }
}
