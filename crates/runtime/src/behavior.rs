//! Policies for automated participants.
//!
//! A policy is a prioritized list of [`SubBehavior`]s. Every time the
//! session needs a command from an automated participant the list is
//! scanned from the top and the first sub-behavior with something to do
//! wins, so a successful step restarts the scan on the next callback.
//! A sub-behavior that cannot act simply yields to the next one; nothing
//! propagates as an error. When the whole list comes up empty the
//! participant idles one action point and retries, and a turn that
//! performed nothing at all closes with an explicit hold.

use std::cmp::Ordering;

use lanefall_core::{
    row_distance, ActionBody, Combat, CombatAction, CombatCommand, MoveDirection, Participant,
    ParticipantId, Team,
};

/// Predicate an intended target must pass before a preference applies.
pub type TargetCondition = fn(&Participant) -> bool;

/// Tie-breaking comparator between two candidate actions.
pub type PreferenceOrdering = fn(&CombatAction, &CombatAction) -> Ordering;

/// One entry of a preferred-action list, referencing an action by name.
pub struct ActionPreference {
    pub action: String,
    pub target_condition: Option<TargetCondition>,
    pub order: Option<PreferenceOrdering>,
}

impl ActionPreference {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target_condition: None,
            order: None,
        }
    }

    pub fn when(mut self, condition: TargetCondition) -> Self {
        self.target_condition = Some(condition);
        self
    }

    pub fn ordered_by(mut self, order: PreferenceOrdering) -> Self {
        self.order = Some(order);
        self
    }
}

/// Closed set of per-turn decision steps.
pub enum SubBehavior {
    /// Take a named defensive action while it is still worth taking.
    ChangeStance { action: String },
    /// Close the row distance when no attack reaches the target.
    AdvanceOnTarget,
    /// Pick from a declared list of preferred actions.
    UsePreferredAction { preferences: Vec<ActionPreference> },
    /// Fire the first usable attack at the current target.
    Attack,
}

impl SubBehavior {
    /// Proposes a command, or nothing when this step cannot act.
    fn plan(&self, combat: &Combat, actor: &Participant) -> Option<CombatCommand> {
        match self {
            SubBehavior::ChangeStance { action } => {
                let (index, candidate) = actor
                    .actions
                    .iter()
                    .enumerate()
                    .find(|(_, a)| {
                        a.name == *action && matches!(a.body, ActionBody::Defensive { .. })
                    })?;
                candidate
                    .usable(actor, 0)
                    .then_some(CombatCommand::UseAction { index })
            }

            SubBehavior::AdvanceOnTarget => {
                if combat.options().confined_space {
                    return None;
                }
                let target = combat.peek_target(actor.id)?;
                let distance = row_distance(actor.row, combat.participant(target)?.row);
                if actor.attack_sets.iter().any(|s| s.usable_at(distance)) {
                    return None;
                }
                let next = match actor.team {
                    Team::Player => actor.row + 1,
                    Team::Opposition => actor.row - 1,
                };
                combat
                    .config()
                    .row_range(actor.team)
                    .contains(&next)
                    .then_some(CombatCommand::Move(MoveDirection::Advance))
            }

            SubBehavior::UsePreferredAction { preferences } => {
                let target = combat
                    .peek_target(actor.id)
                    .and_then(|t| combat.participant(t));
                let distance = target.map_or(0, |t| row_distance(actor.row, t.row));

                let mut candidates: Vec<(usize, &ActionPreference)> = preferences
                    .iter()
                    .filter_map(|pref| {
                        let index = actor.actions.iter().position(|a| a.name == pref.action)?;
                        if !actor.actions[index].usable(actor, distance) {
                            return None;
                        }
                        if let Some(condition) = pref.target_condition {
                            if !condition(target?) {
                                return None;
                            }
                        }
                        Some((index, pref))
                    })
                    .collect();

                // Stable sort: a comparator on either side of the pair
                // decides; entries without one keep their declared
                // relative order.
                candidates.sort_by(|a, b| match a.1.order.or(b.1.order) {
                    Some(order) => order(&actor.actions[a.0], &actor.actions[b.0]),
                    None => Ordering::Equal,
                });

                candidates
                    .first()
                    .map(|(index, _)| CombatCommand::UseAction { index: *index })
            }

            SubBehavior::Attack => {
                let target = combat.peek_target(actor.id)?;
                let distance = row_distance(actor.row, combat.participant(target)?.row);
                actor.attack_sets.iter().enumerate().find_map(|(set, s)| {
                    s.first_usable(distance)
                        .map(|attack| CombatCommand::UseAttack { set, attack })
                })
            }
        }
    }
}

/// A prioritized sub-behavior list.
pub struct BehaviorPolicy {
    pub behaviors: Vec<SubBehavior>,
}

impl Default for BehaviorPolicy {
    /// Fight, and close in when out of reach.
    fn default() -> Self {
        Self {
            behaviors: vec![SubBehavior::Attack, SubBehavior::AdvanceOnTarget],
        }
    }
}

/// Per-participant policy driver with per-turn idle tracking.
pub struct CombatBehavior {
    policy: BehaviorPolicy,
    performed_this_turn: bool,
}

impl CombatBehavior {
    pub fn new(policy: BehaviorPolicy) -> Self {
        Self {
            policy,
            performed_this_turn: false,
        }
    }

    /// Resets idle tracking at a turn boundary.
    pub fn begin_turn(&mut self) {
        self.performed_this_turn = false;
    }

    /// One scan of the prioritized list.
    ///
    /// Nothing to do idles one action point and leaves the scan to retry;
    /// reaching the last point with a turn that performed nothing closes
    /// the turn with an explicit hold.
    pub fn next_command(&mut self, combat: &Combat, id: ParticipantId) -> CombatCommand {
        let Some(actor) = combat.participant(id) else {
            return CombatCommand::Hold;
        };

        for behavior in &self.policy.behaviors {
            if let Some(command) = behavior.plan(combat, actor) {
                self.performed_this_turn = true;
                return command;
            }
        }

        if actor.action_points() > 1 || self.performed_this_turn {
            CombatCommand::Pass
        } else {
            CombatCommand::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanefall_core::{
        ActorSheet, AdvantageCost, Attack, AttackSet, CombatConfig, CombatOptions, EffectGrant,
        EffectKind, ParticipantSpec, SequenceRng, Tick,
    };

    fn sheet(name: &str) -> ActorSheet {
        ActorSheet {
            name: name.into(),
            max_health: 30,
            health: 30,
            protection: 0.0,
            speed: 2.0,
            initiative: 1.0,
            hit_melee_chance: 1.0,
            hit_ranged_chance: 1.0,
            evade_melee_chance: 0.0,
            evade_ranged_chance: 0.0,
            block_chance: 0.0,
            critical_hit_chance: 0.0,
            critical_hit_multiplier: 2.0,
            resilience: 0,
        }
    }

    fn arena(opponent: ParticipantSpec) -> Combat {
        let player = ParticipantSpec::player(sheet("hero"))
            .with_attack_sets(vec![AttackSet::single(Attack::melee("sword", 5.0, 5.0))]);
        Combat::new(
            vec![player, opponent],
            CombatConfig::default(),
            CombatOptions {
                custom_turn_order: Some(vec![
                    (ParticipantId(1), Tick(0)),
                    (ParticipantId::PLAYER, Tick(500)),
                ]),
                ..CombatOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn attacks_when_the_target_is_in_reach() {
        let opponent = ParticipantSpec::opponent(sheet("bandit"), 1)
            .with_attack_sets(vec![AttackSet::single(Attack::melee("claw", 2.0, 2.0))]);
        let combat = arena(opponent);

        let mut behavior = CombatBehavior::new(BehaviorPolicy::default());
        assert_eq!(
            behavior.next_command(&combat, ParticipantId(1)),
            CombatCommand::UseAttack { set: 0, attack: 0 }
        );
    }

    #[test]
    fn advances_when_out_of_reach() {
        let opponent = ParticipantSpec::opponent(sheet("bandit"), 3)
            .with_attack_sets(vec![AttackSet::single(Attack::melee("claw", 2.0, 2.0))]);
        let combat = arena(opponent);

        let mut behavior = CombatBehavior::new(BehaviorPolicy::default());
        assert_eq!(
            behavior.next_command(&combat, ParticipantId(1)),
            CombatCommand::Move(MoveDirection::Advance)
        );
    }

    #[test]
    fn idle_turn_passes_then_holds() {
        // No attacks, confined space: nothing the default policy can do.
        let opponent = ParticipantSpec::opponent(sheet("bystander"), 1);
        let player = ParticipantSpec::player(sheet("hero"))
            .with_attack_sets(vec![AttackSet::single(Attack::melee("sword", 5.0, 5.0))]);
        let mut combat = Combat::new(
            vec![player, opponent],
            CombatConfig::default(),
            CombatOptions {
                confined_space: true,
                custom_turn_order: Some(vec![
                    (ParticipantId(1), Tick(0)),
                    (ParticipantId::PLAYER, Tick(500)),
                ]),
                ..CombatOptions::default()
            },
        )
        .unwrap();
        let mut rng = SequenceRng::new(vec![0.0]);
        combat.advance(&mut rng);

        let mut behavior = CombatBehavior::new(BehaviorPolicy::default());
        behavior.begin_turn();
        let mut issued = Vec::new();
        for _ in 0..3 {
            let command = behavior.next_command(&combat, ParticipantId(1));
            combat
                .apply_command(ParticipantId(1), command.clone(), &mut rng)
                .unwrap();
            issued.push(command);
        }
        assert_eq!(
            issued,
            vec![CombatCommand::Pass, CombatCommand::Pass, CombatCommand::Hold]
        );
    }

    #[test]
    fn stance_change_outranks_attacking_until_applied() {
        let guard = lanefall_core::CombatAction::defensive(
            "guard up",
            AdvantageCost::Points(0),
            vec![EffectGrant::new(EffectKind::GuardUp, 2)],
        );
        let opponent = ParticipantSpec::opponent(sheet("bandit"), 1)
            .with_attack_sets(vec![AttackSet::single(Attack::melee("claw", 2.0, 2.0))])
            .with_actions(vec![guard]);
        let combat = arena(opponent);

        let mut behavior = CombatBehavior::new(BehaviorPolicy {
            behaviors: vec![
                SubBehavior::ChangeStance {
                    action: "guard up".into(),
                },
                SubBehavior::Attack,
            ],
        });
        assert_eq!(
            behavior.next_command(&combat, ParticipantId(1)),
            CombatCommand::UseAction { index: 0 }
        );
    }

    #[test]
    fn preference_comparator_overrides_declared_order() {
        fn weaker_first(a: &CombatAction, b: &CombatAction) -> Ordering {
            a.name.cmp(&b.name)
        }

        let jab = lanefall_core::CombatAction::offensive(
            "a jab",
            AdvantageCost::Points(0),
            lanefall_core::AttackRef { set: 0, attack: 0 },
            0,
        );
        let smash = lanefall_core::CombatAction::offensive(
            "b smash",
            AdvantageCost::Points(0),
            lanefall_core::AttackRef { set: 0, attack: 0 },
            0,
        );
        let opponent = ParticipantSpec::opponent(sheet("bandit"), 1)
            .with_attack_sets(vec![AttackSet::single(Attack::melee("claw", 2.0, 2.0))])
            .with_actions(vec![smash, jab]);
        let combat = arena(opponent);

        // Declared order prefers "b smash" (index 0); the comparator sorts
        // by name and promotes "a jab".
        let mut behavior = CombatBehavior::new(BehaviorPolicy {
            behaviors: vec![SubBehavior::UsePreferredAction {
                preferences: vec![
                    ActionPreference::new("b smash").ordered_by(weaker_first),
                    ActionPreference::new("a jab").ordered_by(weaker_first),
                ],
            }],
        });
        assert_eq!(
            behavior.next_command(&combat, ParticipantId(1)),
            CombatCommand::UseAction { index: 1 }
        );
    }

    #[test]
    fn comparator_on_the_second_entry_still_reorders() {
        fn weaker_first(a: &CombatAction, b: &CombatAction) -> Ordering {
            a.name.cmp(&b.name)
        }

        let jab = lanefall_core::CombatAction::offensive(
            "a jab",
            AdvantageCost::Points(0),
            lanefall_core::AttackRef { set: 0, attack: 0 },
            0,
        );
        let smash = lanefall_core::CombatAction::offensive(
            "b smash",
            AdvantageCost::Points(0),
            lanefall_core::AttackRef { set: 0, attack: 0 },
            0,
        );
        let opponent = ParticipantSpec::opponent(sheet("bandit"), 1)
            .with_attack_sets(vec![AttackSet::single(Attack::melee("claw", 2.0, 2.0))])
            .with_actions(vec![smash, jab]);
        let combat = arena(opponent);

        // Only the lower-priority entry carries the comparator; it must
        // still order against the plain first entry.
        let mut behavior = CombatBehavior::new(BehaviorPolicy {
            behaviors: vec![SubBehavior::UsePreferredAction {
                preferences: vec![
                    ActionPreference::new("b smash"),
                    ActionPreference::new("a jab").ordered_by(weaker_first),
                ],
            }],
        });
        assert_eq!(
            behavior.next_command(&combat, ParticipantId(1)),
            CombatCommand::UseAction { index: 1 }
        );
    }
}
