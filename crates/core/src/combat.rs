//! Combat orchestrator.
//!
//! [`Combat`] owns the roster arena and the merged turn queue and drives
//! the encounter as a step machine: [`Combat::advance`] runs scheduling and
//! the pre-turn gate until someone must act, [`Combat::apply_command`]
//! executes one command for the active participant. The caller (runtime
//! session or test harness) supplies commands for whoever `advance` names,
//! player and automated participants alike.

use std::collections::HashSet;

use crate::action::{ActionBody, CombatAction};
use crate::attack::AttackSet;
use crate::config::{CombatConfig, CombatOptions};
use crate::effect::EffectGrant;
use crate::error::{CommandError, SetupError};
use crate::event::CombatEvent;
use crate::modifier::ParticleModifier;
use crate::participant::{ActorSheet, Participant};
use crate::particle::Particle;
use crate::passive::{PassiveDirective, PassiveList};
use crate::result::ParticleResult;
use crate::rng::Rng;
use crate::state::{row_distance, ParticipantId, Team};
use crate::turn::{Turn, TurnQueue};

/// Declarative description of one roster slot, consumed by [`Combat::new`].
#[derive(Clone, Debug)]
pub struct ParticipantSpec {
    pub team: Team,
    pub row: i32,
    pub automated: bool,
    pub sheet: ActorSheet,
    pub attack_sets: Vec<AttackSet>,
    pub actions: Vec<CombatAction>,
    pub passives: PassiveList,
}

impl ParticipantSpec {
    /// The player slot. Must be first in the roster.
    pub fn player(sheet: ActorSheet) -> Self {
        Self {
            team: Team::Player,
            row: 0,
            automated: false,
            sheet,
            attack_sets: Vec::new(),
            actions: Vec::new(),
            passives: PassiveList::new(),
        }
    }

    /// An automated opponent at the given row.
    pub fn opponent(sheet: ActorSheet, row: i32) -> Self {
        Self {
            team: Team::Opposition,
            row,
            automated: true,
            sheet,
            attack_sets: Vec::new(),
            actions: Vec::new(),
            passives: PassiveList::new(),
        }
    }

    /// An automated ally on the player's side.
    pub fn ally(sheet: ActorSheet, row: i32) -> Self {
        Self {
            team: Team::Player,
            row,
            automated: true,
            sheet,
            attack_sets: Vec::new(),
            actions: Vec::new(),
            passives: PassiveList::new(),
        }
    }

    pub fn with_attack_sets(mut self, attack_sets: Vec<AttackSet>) -> Self {
        self.attack_sets = attack_sets;
        self
    }

    pub fn with_actions(mut self, actions: Vec<CombatAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_passives(mut self, passives: PassiveList) -> Self {
        self.passives = passives;
        self
    }
}

/// One command for the active participant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatCommand {
    /// Pick a target explicitly. Free: costs no action points.
    SelectTarget(ParticipantId),
    /// Fire a raw attack at the current target.
    UseAttack { set: usize, attack: usize },
    /// Perform a combat action by index.
    UseAction { index: usize },
    /// Change rows.
    Move(MoveDirection),
    /// Spend one action point doing nothing.
    Pass,
    /// Give up the rest of the turn.
    Hold,
    /// Concede the encounter.
    Surrender,
}

/// Movement relative to the front line between the two teams.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MoveDirection {
    Advance,
    Retreat,
}

/// What the orchestrator wants next.
#[derive(Clone, Debug, PartialEq)]
pub enum CombatStep {
    /// The named participant holds the active turn and must submit a
    /// command.
    AwaitAction(ParticipantId),
    /// The termination predicate fired; the outcome is final.
    Ended(CombatOutcome),
}

/// How the encounter ended, from the player's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatResult {
    Victory,
    Defeat,
    Surrendered,
}

/// Final report handed back to the surrounding game.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatOutcome {
    pub result: CombatResult,
    pub reports: Vec<ParticipantReport>,
}

/// Per-participant closing statement.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticipantReport {
    pub id: ParticipantId,
    pub name: String,
    pub team: Team,
    pub health: u32,
    pub max_health: u32,
    pub alive: bool,
    pub damage_dealt: u64,
    pub damage_taken: u64,
    pub turns_taken: u32,
    /// Ammunition consumed during the encounter, for inventory reclaim.
    pub ammo_spent: Vec<AmmoSpent>,
}

/// One depleted ammunition pool.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmmoSpent {
    pub attack: String,
    pub spent: u32,
    pub recoverable: bool,
}

/// Read-only view of the battlefield for UIs and narrators.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatSnapshot {
    pub active: Option<ParticipantId>,
    /// Upcoming turns in activation order.
    pub timeline: Vec<Turn>,
    pub participants: Vec<ParticipantView>,
}

/// One roster entry inside a [`CombatSnapshot`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub name: String,
    pub team: Team,
    pub row: i32,
    pub health: u32,
    pub max_health: u32,
    pub action_points: u32,
    pub advantage_points: u32,
    pub effects: Vec<crate::effect::EffectKind>,
    pub alive: bool,
}

/// Per-participant running tallies for the closing report.
#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    damage_dealt: u64,
    damage_taken: u64,
    turns_taken: u32,
}

/// The whole encounter: roster arena, turn queue, termination state.
#[derive(Debug)]
pub struct Combat {
    config: CombatConfig,
    options: CombatOptions,
    roster: Vec<Participant>,
    queue: TurnQueue,
    stats: Vec<Tally>,
    /// Participants who conceded individually and left the fight.
    withdrawn: Vec<bool>,
    started: bool,
    player_surrendered: bool,
    outcome: Option<CombatOutcome>,
}

impl Combat {
    /// Validates the roster and builds the encounter.
    ///
    /// The roster must start with the non-automated player and contain at
    /// least one opposition participant. Rows must sit inside each team's
    /// range and every offensive action must reference an attack its owner
    /// actually has.
    pub fn new(
        specs: Vec<ParticipantSpec>,
        config: CombatConfig,
        options: CombatOptions,
    ) -> Result<Self, SetupError> {
        let first_is_player = specs
            .first()
            .is_some_and(|s| s.team == Team::Player && !s.automated);
        if !first_is_player {
            return Err(SetupError::PlayerNotFirst);
        }
        if !specs.iter().any(|s| s.team == Team::Opposition) {
            return Err(SetupError::NoOpponents);
        }

        let mut roster = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            let id = ParticipantId(index as u32);

            if !config.row_range(spec.team).contains(&spec.row) {
                return Err(SetupError::RowOutOfRange {
                    participant: id,
                    row: spec.row,
                });
            }
            for action in &spec.actions {
                if let ActionBody::Offensive { attack, .. } = &action.body {
                    let resolves = spec
                        .attack_sets
                        .get(attack.set)
                        .and_then(|s| s.get(attack.attack))
                        .is_some();
                    if !resolves {
                        return Err(SetupError::UnknownAttack {
                            participant: id,
                            set: attack.set,
                            attack: attack.attack,
                        });
                    }
                }
            }

            let mut participant =
                Participant::new(id, spec.team, spec.row, spec.automated, spec.sheet, &config);
            participant.attack_sets = spec.attack_sets;
            participant.actions = spec.actions;
            participant.passives = spec.passives;
            participant.health_limit = options.health_limit;
            roster.push(participant);
        }

        if let Some(order) = &options.custom_turn_order {
            for (id, _) in order {
                if id.index() >= roster.len() {
                    return Err(SetupError::UnknownTurnOrderParticipant(*id));
                }
            }
        }

        let count = roster.len();
        Ok(Self {
            config,
            options,
            roster,
            queue: TurnQueue::new(),
            stats: vec![Tally::default(); count],
            withdrawn: vec![false; count],
            started: false,
            player_surrendered: false,
            outcome: None,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn options(&self) -> &CombatOptions {
        &self.options
    }

    pub fn participants(&self) -> &[Participant] {
        &self.roster
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.roster.get(id.index())
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn snapshot(&self) -> CombatSnapshot {
        CombatSnapshot {
            active: self.queue.current().map(|t| t.participant),
            timeline: self.queue.upcoming().to_vec(),
            participants: self
                .roster
                .iter()
                .map(|p| ParticipantView {
                    id: p.id,
                    name: p.sheet.name.clone(),
                    team: p.team,
                    row: p.row,
                    health: p.sheet.health,
                    max_health: p.sheet.max_health,
                    action_points: p.action_points(),
                    advantage_points: p.advantage_points(),
                    effects: p.effects.iter().map(|e| e.kind).collect(),
                    alive: p.is_alive(),
                })
                .collect(),
        }
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Seeds the opening turn order and runs pre-combat passives.
    ///
    /// Idempotent; [`Combat::advance`] calls it on first use.
    pub fn begin(&mut self, rng: &mut dyn Rng) {
        if self.started {
            return;
        }
        self.started = true;

        for participant in self.roster.iter_mut() {
            let directives: Vec<_> = participant
                .passives
                .iter()
                .rev()
                .filter_map(|p| p.on_combat_start())
                .collect();
            for directive in directives {
                apply_directive(participant, directive);
            }
        }

        let named: HashSet<ParticipantId> = match &self.options.custom_turn_order {
            Some(order) => {
                for (id, timestamp) in order {
                    self.queue.schedule_custom(*id, *timestamp);
                }
                order.iter().map(|(id, _)| *id).collect()
            }
            None => HashSet::new(),
        };

        for index in 0..self.roster.len() {
            let p = &self.roster[index];
            if named.contains(&p.id) {
                continue;
            }
            self.queue
                .schedule_initial(p.id, p.turn_interval, p.sheet.initiative, rng);
        }
    }

    /// Drives scheduling until someone must act or the encounter is over.
    ///
    /// The active participant keeps being returned until its action points
    /// run out, then the queue rotates. The pre-turn gate (damage over
    /// time, effect expiry, action point refill, turn-start passives) runs
    /// exactly once per activation; a participant that bleeds out in the
    /// gate forfeits the turn.
    pub fn advance(&mut self, rng: &mut dyn Rng) -> CombatStep {
        if !self.started {
            self.begin(rng);
        }

        loop {
            if let Some(outcome) = self.check_termination() {
                return CombatStep::Ended(outcome);
            }

            if let Some(turn) = self.queue.current() {
                if self.in_play(turn.participant)
                    && self.roster[turn.participant.index()].action_points() > 0
                {
                    return CombatStep::AwaitAction(turn.participant);
                }
                Self::run_turn_end_passives(&mut self.roster[turn.participant.index()]);
            }

            let Some(turn) = self.queue.rotate() else {
                // Everyone withdrew; nothing left to schedule.
                return CombatStep::Ended(self.finish(CombatResult::Defeat));
            };
            let id = turn.participant;

            if !self.in_play(id) {
                self.queue.prune_upcoming(id);
                continue;
            }

            // Lookahead: the successor turn exists before the current one
            // plays out, so the timeline snapshot always shows it.
            let interval = self.roster[id.index()].turn_interval;
            self.queue.schedule_regular(id, interval);

            self.open_turn(id, turn);
            if !self.in_play(id) {
                self.queue.prune_upcoming(id);
                continue;
            }

            return CombatStep::AwaitAction(id);
        }
    }

    /// Executes one command for the active participant.
    pub fn apply_command(
        &mut self,
        id: ParticipantId,
        command: CombatCommand,
        rng: &mut dyn Rng,
    ) -> Result<(), CommandError> {
        if self.outcome.is_some() {
            return Err(CommandError::CombatEnded);
        }
        let current = self
            .queue
            .current()
            .ok_or(CommandError::NotYourTurn(id))?;
        if current.participant != id {
            return Err(CommandError::NotYourTurn(id));
        }
        if !self.roster[id.index()].can_act(true) {
            return Err(CommandError::OutOfActionPoints);
        }

        match command {
            CombatCommand::SelectTarget(target) => self.select_target(id, target),
            CombatCommand::UseAttack { set, attack } => self.use_attack(id, set, attack, rng),
            CombatCommand::UseAction { index } => self.use_action(id, index, rng),
            CombatCommand::Move(direction) => self.move_row(id, direction),
            CombatCommand::Pass => {
                self.roster[id.index()].spend_action_points(1);
                Ok(())
            }
            CombatCommand::Hold => {
                let p = &mut self.roster[id.index()];
                p.events.push(CombatEvent::Held);
                p.exhaust_action_points();
                Ok(())
            }
            CombatCommand::Surrender => {
                let p = &mut self.roster[id.index()];
                p.events.push(CombatEvent::Surrendered);
                p.exhaust_action_points();
                if id.is_player() {
                    self.player_surrendered = true;
                } else {
                    self.withdrawn[id.index()] = true;
                    self.queue.prune_upcoming(id);
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn select_target(
        &mut self,
        id: ParticipantId,
        target: ParticipantId,
    ) -> Result<(), CommandError> {
        let team = self.roster[id.index()].team;
        if target.index() >= self.roster.len() || !self.is_targetable(target, team) {
            return Err(CommandError::InvalidTarget(target));
        }
        let target_row = self.roster[target.index()].row;

        let p = &mut self.roster[id.index()];
        p.target = Some(target);
        p.last_target_row = Some(target_row);
        Ok(())
    }

    fn use_attack(
        &mut self,
        id: ParticipantId,
        set: usize,
        attack: usize,
        rng: &mut dyn Rng,
    ) -> Result<(), CommandError> {
        let target = self.resolve_target(id).ok_or(CommandError::NoTarget)?;
        let distance = row_distance(self.roster[id.index()].row, self.roster[target.index()].row);

        let (damage, name, advantage_on_hit) = {
            let owner = &mut self.roster[id.index()];
            let atk = owner
                .attack_sets
                .get_mut(set)
                .and_then(|s| s.get_mut(attack))
                .ok_or(CommandError::UnknownAttack { set, attack })?;
            if !atk.usable_at(distance) {
                return Err(CommandError::AttackOutOfRange);
            }
            atk.spend_ammo();
            (atk.damage, atk.name.clone(), atk.advantage_on_hit)
        };

        {
            let owner = &mut self.roster[id.index()];
            owner.begin_action();
            Self::run_pre_action_passives(owner);
            owner.events.push(CombatEvent::AttackUsed { attack: name });
        }

        let result = self.launch_particle(id, target, damage, &[], &[], rng);

        let owner = &mut self.roster[id.index()];
        if result.connected() && advantage_on_hit > 0.0 {
            owner.add_advantage_points(advantage_on_hit);
        }
        Self::run_post_action_passives(owner);
        owner.spend_action_points(1);
        owner.finish_action();
        Ok(())
    }

    fn use_action(
        &mut self,
        id: ParticipantId,
        index: usize,
        rng: &mut dyn Rng,
    ) -> Result<(), CommandError> {
        let action = self.roster[id.index()]
            .actions
            .get(index)
            .cloned()
            .ok_or(CommandError::UnknownAction { index })?;

        let target = match &action.body {
            ActionBody::Offensive { .. } => {
                Some(self.resolve_target(id).ok_or(CommandError::NoTarget)?)
            }
            ActionBody::Defensive { .. } => None,
        };
        let distance = target.map_or(0, |t| {
            row_distance(self.roster[id.index()].row, self.roster[t.index()].row)
        });

        {
            let owner = &self.roster[id.index()];
            if !action.fulfills_advantage_requirements(owner.advantage_points())
                || !action.fulfills_non_advantage_requirements(owner, distance)
            {
                return Err(CommandError::ActionUnusable {
                    name: action.name.clone(),
                });
            }
        }

        match &action.body {
            ActionBody::Defensive { effects } => {
                let owner = &mut self.roster[id.index()];
                owner.begin_action();
                action.deduct_cost(owner);
                Self::run_pre_action_passives(owner);
                for grant in effects {
                    if owner.effects.add(grant.kind, grant.duration_turns) {
                        owner
                            .events
                            .push(CombatEvent::EffectApplied { effect: grant.kind });
                    }
                }
                Self::close_action(owner, &action.name);
            }
            ActionBody::Offensive {
                attack,
                splash_range,
                modifiers,
                effects,
            } => {
                // `target` is Some by construction for offensive bodies.
                let target = target.ok_or(CommandError::NoTarget)?;
                let team = self.roster[id.index()].team;
                let receivers = self.splash_receivers(team, target, *splash_range);

                let (damage, advantage_on_hit) = {
                    let owner = &mut self.roster[id.index()];
                    owner.begin_action();
                    action.deduct_cost(owner);
                    Self::run_pre_action_passives(owner);
                    match owner
                        .attack_sets
                        .get_mut(attack.set)
                        .and_then(|s| s.get_mut(attack.attack))
                    {
                        Some(atk) => {
                            // Ammunition is spent once for the whole fan-out.
                            atk.spend_ammo();
                            (atk.damage, atk.advantage_on_hit)
                        }
                        None => {
                            owner.finish_action();
                            return Err(CommandError::UnknownAttack {
                                set: attack.set,
                                attack: attack.attack,
                            });
                        }
                    }
                };

                let mut connected = false;
                for receiver in receivers {
                    let result =
                        self.launch_particle(id, receiver, damage, modifiers, effects, rng);
                    connected |= result.connected();
                }

                let owner = &mut self.roster[id.index()];
                if connected && advantage_on_hit > 0.0 {
                    owner.add_advantage_points(advantage_on_hit);
                }
                Self::close_action(owner, &action.name);
            }
        }
        Ok(())
    }

    fn move_row(&mut self, id: ParticipantId, direction: MoveDirection) -> Result<(), CommandError> {
        if self.options.confined_space {
            return Err(CommandError::ConfinedSpace);
        }
        let (team, row) = {
            let p = &self.roster[id.index()];
            (p.team, p.row)
        };
        // Advance closes on the front line between the teams.
        let delta = match (team, direction) {
            (Team::Player, MoveDirection::Advance) => 1,
            (Team::Player, MoveDirection::Retreat) => -1,
            (Team::Opposition, MoveDirection::Advance) => -1,
            (Team::Opposition, MoveDirection::Retreat) => 1,
        };
        let next = row + delta;
        if !self.config.row_range(team).contains(&next) {
            return Err(CommandError::RowBlocked);
        }

        let p = &mut self.roster[id.index()];
        p.row = next;
        p.events.push(CombatEvent::Moved { from: row, to: next });
        p.spend_action_points(1);
        Ok(())
    }

    // ========================================================================
    // Targeting
    // ========================================================================

    fn in_play(&self, id: ParticipantId) -> bool {
        !self.withdrawn[id.index()] && self.roster[id.index()].in_fighting_shape()
    }

    fn is_targetable(&self, target: ParticipantId, attacker_team: Team) -> bool {
        self.in_play(target) && self.roster[target.index()].team != attacker_team
    }

    /// Living opponents of a team in ascending row order.
    fn opponents_in_row_order(&self, team: Team) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self
            .roster
            .iter()
            .filter(|p| p.team == team.opposing() && self.in_play(p.id))
            .map(|p| p.id)
            .collect();
        ids.sort_by_key(|id| self.roster[id.index()].row);
        ids
    }

    /// The target the actor would engage right now, without committing.
    ///
    /// The current target is kept while it stands. A replacement is the
    /// living opponent nearest the last target's row, ties broken by
    /// closeness to the actor's own row; with no history the frontmost
    /// opponent is taken.
    pub fn peek_target(&self, actor: ParticipantId) -> Option<ParticipantId> {
        let a = self.roster.get(actor.index())?;

        if let Some(target) = a.target {
            if self.is_targetable(target, a.team) {
                return Some(target);
            }
        }

        let candidates = self.opponents_in_row_order(a.team);
        match a.last_target_row {
            Some(anchor) => candidates.iter().copied().min_by_key(|&id| {
                let r = self.roster[id.index()].row;
                (row_distance(r, anchor), row_distance(r, a.row))
            }),
            None => candidates.first().copied(),
        }
    }

    /// Revalidates the actor's target and commits the choice.
    fn resolve_target(&mut self, actor: ParticipantId) -> Option<ParticipantId> {
        let choice = self.peek_target(actor);
        let chosen_row = choice.map(|t| self.roster[t.index()].row);

        let a = &mut self.roster[actor.index()];
        a.target = choice;
        if chosen_row.is_some() {
            a.last_target_row = chosen_row;
        }
        choice
    }

    /// Splash siblings within `splash_range` positions of the target in the
    /// row-ordered living-opponent list. The primary target resolves last.
    fn splash_receivers(
        &self,
        team: Team,
        target: ParticipantId,
        splash_range: u32,
    ) -> Vec<ParticipantId> {
        let order = self.opponents_in_row_order(team);
        let Some(position) = order.iter().position(|&id| id == target) else {
            return vec![target];
        };

        let mut receivers: Vec<ParticipantId> = order
            .iter()
            .enumerate()
            .filter(|(i, &id)| id != target && i.abs_diff(position) as u32 <= splash_range)
            .map(|(_, &id)| id)
            .collect();
        receivers.push(target);
        receivers
    }

    // ========================================================================
    // Particle launch
    // ========================================================================

    /// Builds, decorates and fires one particle, then applies the sender's
    /// and receiver's post hooks and updates the tallies.
    fn launch_particle(
        &mut self,
        sender_id: ParticipantId,
        receiver_id: ParticipantId,
        damage: (f64, f64),
        modifiers: &[ParticleModifier],
        effects: &[EffectGrant],
        rng: &mut dyn Rng,
    ) -> ParticleResult {
        let result = {
            let (sender, receiver) =
                split_pair(&mut self.roster, sender_id.index(), receiver_id.index());

            let mut particle =
                Particle::new(sender, receiver, damage).with_effects(effects.to_vec());
            particle.push_modifiers(modifiers);
            for passive in sender.passives.iter().rev() {
                if let Some(PassiveDirective::AddModifier(m)) = passive.on_pre_cast() {
                    particle.push_modifier(m);
                }
            }
            for passive in receiver.passives.iter().rev() {
                if let Some(PassiveDirective::AddModifier(m)) = passive.on_pre_receive() {
                    particle.push_modifier(m);
                }
            }

            let result = particle.fire(receiver, rng).clone();

            let cast_reactions: Vec<_> = sender
                .passives
                .iter()
                .rev()
                .filter_map(|p| p.on_post_cast(&result))
                .collect();
            for directive in cast_reactions {
                apply_directive(sender, directive);
            }
            let receive_reactions: Vec<_> = receiver
                .passives
                .iter()
                .rev()
                .filter_map(|p| p.on_post_receive(&result))
                .collect();
            for directive in receive_reactions {
                apply_directive(receiver, directive);
            }

            result
        };

        self.stats[sender_id.index()].damage_dealt += u64::from(result.inflicted_damage);
        self.stats[receiver_id.index()].damage_taken += u64::from(result.inflicted_damage);

        // Discard queued turns the moment the receiver drops out, so the
        // timeline never shows a fallen participant.
        if !self.roster[receiver_id.index()].in_fighting_shape() {
            self.queue.prune_upcoming(receiver_id);
        }
        result
    }

    // ========================================================================
    // Turn lifecycle
    // ========================================================================

    /// Pre-turn gate: damage over time, effect expiry, action point refill,
    /// turn-start passives.
    fn open_turn(&mut self, id: ParticipantId, turn: Turn) {
        let p = &mut self.roster[id.index()];

        let dot: u32 = p.effects.iter().map(|e| e.kind.turn_start_damage()).sum();
        if dot > 0 {
            let taken = p.take_damage(dot);
            if taken.applied > 0 {
                p.events.push(CombatEvent::Damaged {
                    by: id,
                    amount: taken.applied,
                    critical: false,
                    protected: false,
                });
            }
            if taken.defeated {
                p.events.push(CombatEvent::Defeated);
            }
        }
        p.effects.tick_down();

        if !p.in_fighting_shape() {
            return;
        }

        p.refill_action_points();
        p.record_turn(turn);

        let directives: Vec<_> = p
            .passives
            .iter()
            .rev()
            .filter_map(|x| x.on_turn_start(p.sheet.health, p.sheet.max_health))
            .collect();
        for directive in directives {
            apply_directive(p, directive);
        }

        self.stats[id.index()].turns_taken += 1;
    }

    fn run_pre_action_passives(owner: &mut Participant) {
        // Last-to-first so later-granted passives take precedence.
        let directives: Vec<_> = owner
            .passives
            .iter()
            .rev()
            .filter_map(|p| p.on_pre_action())
            .collect();
        for directive in directives {
            apply_directive(owner, directive);
        }
    }

    fn run_post_action_passives(owner: &mut Participant) {
        let directives: Vec<_> = owner
            .passives
            .iter()
            .rev()
            .filter_map(|p| p.on_post_action())
            .collect();
        for directive in directives {
            apply_directive(owner, directive);
        }
    }

    fn run_turn_end_passives(owner: &mut Participant) {
        let directives: Vec<_> = owner
            .passives
            .iter()
            .rev()
            .filter_map(|p| p.on_turn_end())
            .collect();
        for directive in directives {
            apply_directive(owner, directive);
        }
    }

    fn close_action(owner: &mut Participant, name: &str) {
        Self::run_post_action_passives(owner);
        owner.events.push(CombatEvent::ActionTaken {
            action: name.to_owned(),
        });
        owner.spend_action_points(1);
        owner.finish_action();
    }

    // ========================================================================
    // Termination
    // ========================================================================

    /// Evaluates the termination predicate. The outcome is built at most
    /// once; afterwards the stored copy is returned.
    fn check_termination(&mut self) -> Option<CombatOutcome> {
        if let Some(existing) = &self.outcome {
            return Some(existing.clone());
        }
        if self.player_surrendered {
            return Some(self.finish(CombatResult::Surrendered));
        }
        if !self.in_play(ParticipantId::PLAYER) {
            return Some(self.finish(CombatResult::Defeat));
        }
        // A bout with a health limit ends the moment anyone touches the
        // floor; the side that was driven there loses.
        let limited_team = self
            .roster
            .iter()
            .find(|p| p.at_health_limit())
            .map(|p| p.team);
        if let Some(team) = limited_team {
            let result = match team {
                Team::Opposition => CombatResult::Victory,
                Team::Player => CombatResult::Defeat,
            };
            return Some(self.finish(result));
        }
        let opposition_standing = self
            .roster
            .iter()
            .any(|p| p.team == Team::Opposition && self.in_play(p.id));
        if !opposition_standing {
            return Some(self.finish(CombatResult::Victory));
        }
        None
    }

    fn finish(&mut self, result: CombatResult) -> CombatOutcome {
        if let Some(existing) = &self.outcome {
            return existing.clone();
        }

        for participant in self.roster.iter_mut() {
            let directives: Vec<_> = participant
                .passives
                .iter()
                .rev()
                .filter_map(|p| p.on_combat_end())
                .collect();
            for directive in directives {
                apply_directive(participant, directive);
            }
        }
        self.queue.clear_current();

        let reports = self
            .roster
            .iter()
            .enumerate()
            .map(|(index, p)| ParticipantReport {
                id: p.id,
                name: p.sheet.name.clone(),
                team: p.team,
                health: p.sheet.health,
                max_health: p.sheet.max_health,
                alive: p.is_alive(),
                damage_dealt: self.stats[index].damage_dealt,
                damage_taken: self.stats[index].damage_taken,
                turns_taken: self.stats[index].turns_taken,
                ammo_spent: ammo_report(p),
            })
            .collect();

        let outcome = CombatOutcome { result, reports };
        self.outcome = Some(outcome.clone());
        outcome
    }
}

/// Applies one passive directive to its owner.
fn apply_directive(owner: &mut Participant, directive: PassiveDirective) {
    match directive {
        PassiveDirective::GainAdvantage(amount) => owner.add_advantage_points(amount),
        PassiveDirective::Heal(amount) => {
            owner.heal(amount);
        }
        // Modifier directives only make sense while a particle is being
        // prepared; elsewhere they are inert.
        PassiveDirective::AddModifier(_) => {}
    }
}

/// Depleted ammunition pools of one participant.
fn ammo_report(participant: &Participant) -> Vec<AmmoSpent> {
    participant
        .attack_sets
        .iter()
        .flat_map(|set| set.iter())
        .filter_map(|attack| {
            let pool = attack.ammo.as_ref()?;
            (pool.spent > 0).then(|| AmmoSpent {
                attack: attack.name.clone(),
                spent: pool.spent,
                recoverable: pool.recoverable,
            })
        })
        .collect()
}

/// Disjoint mutable borrows of two roster slots.
fn split_pair(roster: &mut [Participant], a: usize, b: usize) -> (&mut Participant, &mut Participant) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = roster.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = roster.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionBody, AdvantageCost, AttackRef};
    use crate::attack::{AmmoPool, Attack, AttackSet};
    use crate::effect::{EffectGrant, EffectKind};
    use crate::passive::Passive;
    use crate::rng::SequenceRng;
    use crate::state::Tick;

    fn sheet(name: &str, health: u32) -> ActorSheet {
        ActorSheet {
            name: name.into(),
            max_health: health,
            health,
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

    fn player_spec() -> ParticipantSpec {
        ParticipantSpec::player(sheet("hero", 40)).with_attack_sets(vec![AttackSet::new(vec![
            Attack::melee("shortsword", 5.0, 5.0),
            Attack::ranged("throwing knife", 5.0, 5.0, AmmoPool::new(3, true)),
        ])])
    }

    fn opponent_spec(name: &str, health: u32, row: i32) -> ParticipantSpec {
        ParticipantSpec::opponent(sheet(name, health), row)
            .with_attack_sets(vec![AttackSet::single(Attack::melee("claw", 3.0, 3.0))])
    }

    fn custom_order(count: u32) -> CombatOptions {
        CombatOptions {
            custom_turn_order: Some(
                (0..count)
                    .map(|i| (ParticipantId(i), Tick(u64::from(i) * 100)))
                    .collect(),
            ),
            ..CombatOptions::default()
        }
    }

    fn duel(opponent_health: u32) -> Combat {
        Combat::new(
            vec![player_spec(), opponent_spec("bandit", opponent_health, 1)],
            CombatConfig::default(),
            custom_order(2),
        )
        .unwrap()
    }

    // Guaranteed hit, no block, no evade, no crit.
    fn sure_rng() -> SequenceRng {
        SequenceRng::new(vec![0.0])
    }

    #[test]
    fn setup_rejects_empty_opposition() {
        let err = Combat::new(
            vec![player_spec()],
            CombatConfig::default(),
            CombatOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, SetupError::NoOpponents);
    }

    #[test]
    fn setup_rejects_non_player_first() {
        let err = Combat::new(
            vec![opponent_spec("bandit", 20, 1)],
            CombatConfig::default(),
            CombatOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, SetupError::PlayerNotFirst);
    }

    #[test]
    fn setup_rejects_row_outside_team_range() {
        let err = Combat::new(
            vec![player_spec(), opponent_spec("bandit", 20, 9)],
            CombatConfig::default(),
            CombatOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::RowOutOfRange { row: 9, .. }));
    }

    #[test]
    fn custom_order_gives_player_the_first_turn() {
        let mut combat = duel(20);
        let mut rng = sure_rng();
        assert_eq!(
            combat.advance(&mut rng),
            CombatStep::AwaitAction(ParticipantId::PLAYER)
        );
    }

    #[test]
    fn lethal_attack_ends_combat_exactly_once() {
        let mut combat = duel(5);
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAttack { set: 0, attack: 0 },
                &mut rng,
            )
            .unwrap();

        let CombatStep::Ended(outcome) = combat.advance(&mut rng) else {
            panic!("expected the encounter to end");
        };
        assert_eq!(outcome.result, CombatResult::Victory);
        assert!(!outcome.reports[1].alive);
        assert_eq!(outcome.reports[0].damage_dealt, 5);

        // Repeated stepping keeps returning the same final outcome.
        assert_eq!(combat.advance(&mut rng), CombatStep::Ended(outcome));
        assert_eq!(
            combat
                .apply_command(ParticipantId::PLAYER, CombatCommand::Hold, &mut rng)
                .unwrap_err(),
            CommandError::CombatEnded
        );
    }

    #[test]
    fn splash_strikes_row_siblings_of_the_target() {
        // The volley wraps the ranged throwing knife so the middle-row
        // target at distance 2 passes the usability gate.
        let action = CombatAction::offensive(
            "knife volley",
            AdvantageCost::Points(0),
            AttackRef { set: 0, attack: 1 },
            1,
        );
        let mut combat = Combat::new(
            vec![
                player_spec().with_actions(vec![action]),
                opponent_spec("front", 20, 1),
                opponent_spec("middle", 20, 2),
                opponent_spec("rear", 20, 3),
            ],
            CombatConfig::default(),
            custom_order(4),
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);

        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::SelectTarget(ParticipantId(2)),
                &mut rng,
            )
            .unwrap();
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAction { index: 0 },
                &mut rng,
            )
            .unwrap();

        // One position either side of the middle target.
        assert_eq!(combat.participant(ParticipantId(1)).unwrap().sheet.health, 15);
        assert_eq!(combat.participant(ParticipantId(2)).unwrap().sheet.health, 15);
        assert_eq!(combat.participant(ParticipantId(3)).unwrap().sheet.health, 15);

        // Ammunition is spent once for the whole fan-out.
        let knife = combat
            .participant(ParticipantId::PLAYER)
            .unwrap()
            .attack_sets[0]
            .get(1)
            .unwrap();
        assert_eq!(knife.ammo.unwrap().spent, 1);
    }

    #[test]
    fn splash_zero_only_hits_the_target() {
        let action = CombatAction::offensive(
            "thrust",
            AdvantageCost::Points(0),
            AttackRef { set: 0, attack: 0 },
            0,
        );
        let mut combat = Combat::new(
            vec![
                player_spec().with_actions(vec![action]),
                opponent_spec("front", 20, 1),
                opponent_spec("middle", 20, 2),
            ],
            CombatConfig::default(),
            custom_order(3),
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAction { index: 0 },
                &mut rng,
            )
            .unwrap();

        assert_eq!(combat.participant(ParticipantId(1)).unwrap().sheet.health, 15);
        assert_eq!(combat.participant(ParticipantId(2)).unwrap().sheet.health, 20);
    }

    #[test]
    fn hold_forfeits_the_turn() {
        let mut combat = duel(20);
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        combat
            .apply_command(ParticipantId::PLAYER, CombatCommand::Hold, &mut rng)
            .unwrap();
        assert_eq!(
            combat.advance(&mut rng),
            CombatStep::AwaitAction(ParticipantId(1))
        );
    }

    #[test]
    fn player_surrender_ends_the_encounter() {
        let mut combat = duel(20);
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        combat
            .apply_command(ParticipantId::PLAYER, CombatCommand::Surrender, &mut rng)
            .unwrap();

        let CombatStep::Ended(outcome) = combat.advance(&mut rng) else {
            panic!("expected the encounter to end");
        };
        assert_eq!(outcome.result, CombatResult::Surrendered);
    }

    #[test]
    fn confined_space_refuses_movement() {
        let mut combat = Combat::new(
            vec![player_spec(), opponent_spec("bandit", 20, 1)],
            CombatConfig::default(),
            CombatOptions {
                confined_space: true,
                custom_turn_order: Some(vec![
                    (ParticipantId::PLAYER, Tick(0)),
                    (ParticipantId(1), Tick(100)),
                ]),
                ..CombatOptions::default()
            },
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        assert_eq!(
            combat
                .apply_command(
                    ParticipantId::PLAYER,
                    CombatCommand::Move(MoveDirection::Retreat),
                    &mut rng
                )
                .unwrap_err(),
            CommandError::ConfinedSpace
        );
    }

    #[test]
    fn movement_stops_at_the_lane_edge() {
        let mut combat = duel(20);
        let mut rng = sure_rng();
        combat.advance(&mut rng);

        // The player opens at row 0, the front edge of its range.
        assert_eq!(
            combat
                .apply_command(
                    ParticipantId::PLAYER,
                    CombatCommand::Move(MoveDirection::Advance),
                    &mut rng
                )
                .unwrap_err(),
            CommandError::RowBlocked
        );
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::Move(MoveDirection::Retreat),
                &mut rng,
            )
            .unwrap();
        assert_eq!(combat.participant(ParticipantId::PLAYER).unwrap().row, -1);
        assert_eq!(
            combat
                .participant(ParticipantId::PLAYER)
                .unwrap()
                .action_points(),
            2
        );
    }

    #[test]
    fn fallen_target_is_replaced_by_row_neighbor() {
        let mut combat = Combat::new(
            vec![
                player_spec(),
                opponent_spec("front", 5, 1),
                opponent_spec("rear", 5, 2),
            ],
            CombatConfig::default(),
            custom_order(3),
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);

        // First attack auto-targets the frontmost opponent and fells it.
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAttack { set: 0, attack: 0 },
                &mut rng,
            )
            .unwrap();
        assert!(!combat.participant(ParticipantId(1)).unwrap().is_alive());

        // Re-targeting lands on the survivor; it sits at distance 2, so the
        // thrown weapon reaches it.
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAttack { set: 0, attack: 1 },
                &mut rng,
            )
            .unwrap();

        let CombatStep::Ended(outcome) = combat.advance(&mut rng) else {
            panic!("expected the encounter to end");
        };
        assert_eq!(outcome.result, CombatResult::Victory);
        assert_eq!(
            outcome.reports[0].ammo_spent,
            vec![AmmoSpent {
                attack: "throwing knife".into(),
                spent: 1,
                recoverable: true,
            }]
        );
    }

    #[test]
    fn health_limit_ends_the_spar_with_everyone_standing() {
        let mut combat = Combat::new(
            vec![player_spec(), opponent_spec("sparring partner", 12, 1)],
            CombatConfig::default(),
            CombatOptions {
                health_limit: Some(10),
                custom_turn_order: Some(vec![
                    (ParticipantId::PLAYER, Tick(0)),
                    (ParticipantId(1), Tick(100)),
                ]),
                ..CombatOptions::default()
            },
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAttack { set: 0, attack: 0 },
                &mut rng,
            )
            .unwrap();

        let CombatStep::Ended(outcome) = combat.advance(&mut rng) else {
            panic!("expected the spar to end");
        };
        assert_eq!(outcome.result, CombatResult::Victory);
        assert!(outcome.reports[1].alive);
        assert_eq!(outcome.reports[1].health, 10);
    }

    #[test]
    fn first_participant_at_the_health_limit_ends_a_group_spar() {
        let mut combat = Combat::new(
            vec![
                player_spec(),
                opponent_spec("first partner", 12, 1),
                opponent_spec("second partner", 12, 2),
            ],
            CombatConfig::default(),
            CombatOptions {
                health_limit: Some(10),
                custom_turn_order: Some(vec![
                    (ParticipantId::PLAYER, Tick(0)),
                    (ParticipantId(1), Tick(100)),
                    (ParticipantId(2), Tick(200)),
                ]),
                ..CombatOptions::default()
            },
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAttack { set: 0, attack: 0 },
                &mut rng,
            )
            .unwrap();

        // One partner on the floor ends the whole bout; the other is
        // untouched but does not fight on.
        let CombatStep::Ended(outcome) = combat.advance(&mut rng) else {
            panic!("expected the spar to end");
        };
        assert_eq!(outcome.result, CombatResult::Victory);
        assert_eq!(outcome.reports[1].health, 10);
        assert_eq!(outcome.reports[2].health, 12);
    }

    #[test]
    fn momentum_rewards_a_raw_attack() {
        let mut passives = PassiveList::new();
        passives.push(Passive::Momentum { advantage: 100.0 });

        let mut combat = Combat::new(
            vec![
                player_spec().with_passives(passives),
                opponent_spec("bandit", 20, 1),
            ],
            CombatConfig::default(),
            custom_order(2),
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);

        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAttack { set: 0, attack: 0 },
                &mut rng,
            )
            .unwrap();
        assert_eq!(
            combat
                .participant(ParticipantId::PLAYER)
                .unwrap()
                .advantage_points(),
            100
        );
    }

    #[test]
    fn lethal_hit_discards_the_victims_queued_turns() {
        let mut combat = duel(5);
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAttack { set: 0, attack: 0 },
                &mut rng,
            )
            .unwrap();

        // The timeline drops the fallen opponent immediately, before the
        // queue next rotates into its slot.
        assert!(combat
            .snapshot()
            .timeline
            .iter()
            .all(|turn| turn.participant != ParticipantId(1)));
    }

    #[test]
    fn defensive_action_applies_effect_and_spends_advantage() {
        let action = CombatAction::defensive(
            "guard",
            AdvantageCost::Points(300),
            vec![EffectGrant::new(EffectKind::GuardUp, 2)],
        );
        let mut passives = PassiveList::new();
        passives.push(Passive::BattleReady { advantage: 300.0 });

        let mut combat = Combat::new(
            vec![
                player_spec()
                    .with_actions(vec![action])
                    .with_passives(passives),
                opponent_spec("bandit", 20, 1),
            ],
            CombatConfig::default(),
            custom_order(2),
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);

        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAction { index: 0 },
                &mut rng,
            )
            .unwrap();

        let player = combat.participant(ParticipantId::PLAYER).unwrap();
        assert!(player.effects.has(EffectKind::GuardUp));
        assert_eq!(player.advantage_points(), 0);
        assert_eq!(player.action_points(), 2);
    }

    #[test]
    fn bleeding_ticks_at_the_victims_turn_start() {
        let action = CombatAction::offensive(
            "serrated cut",
            AdvantageCost::Points(0),
            AttackRef { set: 0, attack: 0 },
            0,
        )
        .with_particle_effects(vec![EffectGrant::new(EffectKind::Bleeding, 3)]);

        let mut combat = Combat::new(
            vec![
                player_spec().with_actions(vec![action]),
                opponent_spec("bandit", 20, 1),
            ],
            CombatConfig::default(),
            custom_order(2),
        )
        .unwrap();
        let mut rng = sure_rng();
        combat.advance(&mut rng);

        combat
            .apply_command(
                ParticipantId::PLAYER,
                CombatCommand::UseAction { index: 0 },
                &mut rng,
            )
            .unwrap();
        assert_eq!(combat.participant(ParticipantId(1)).unwrap().sheet.health, 15);
        combat
            .apply_command(ParticipantId::PLAYER, CombatCommand::Hold, &mut rng)
            .unwrap();

        // The wound bleeds in the opponent's pre-turn gate.
        assert_eq!(
            combat.advance(&mut rng),
            CombatStep::AwaitAction(ParticipantId(1))
        );
        assert_eq!(combat.participant(ParticipantId(1)).unwrap().sheet.health, 14);
    }

    #[test]
    fn commands_from_the_wrong_participant_are_rejected() {
        let mut combat = duel(20);
        let mut rng = sure_rng();
        combat.advance(&mut rng);
        assert_eq!(
            combat
                .apply_command(ParticipantId(1), CombatCommand::Hold, &mut rng)
                .unwrap_err(),
            CommandError::NotYourTurn(ParticipantId(1))
        );
    }
}
