//! Combat session worker.
//!
//! [`CombatSession`] owns a [`Combat`] and drives it to completion:
//! automated participants act through their behavior policies, the
//! player's turns suspend on the action provider until the UI feeds a
//! command. The session resolves exactly once, with whether the player
//! won, and fans the ending out through the [`OutcomeSinks`].

use std::collections::HashMap;

use tokio::sync::mpsc;

use lanefall_core::{
    Combat, CombatCommand, CombatConfig, CombatOptions, CombatOutcome, CombatResult, CombatStep,
    ParticipantId, ParticipantSpec, Pcg32, Rng,
};

use crate::api::{ActionProvider, ChannelProvider, Result, SessionHandle};
use crate::behavior::{BehaviorPolicy, CombatBehavior};
use crate::events::{EventBus, SessionEvent};
use crate::pacing::{NoopPacer, Pacer};
use crate::sinks::{NoopSinks, OutcomeSinks};

/// A fully wired encounter, ready to run.
pub struct CombatSession {
    combat: Combat,
    rng: Box<dyn Rng + Send>,
    provider: Box<dyn ActionProvider>,
    pacer: Box<dyn Pacer>,
    sinks: Box<dyn OutcomeSinks>,
    behaviors: HashMap<ParticipantId, CombatBehavior>,
    bus: EventBus,
}

impl CombatSession {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Runs the encounter to completion.
    ///
    /// Resolves exactly once with whether the player won. Consumes the
    /// session; a new encounter needs a new session.
    pub async fn start_combat(mut self) -> Result<bool> {
        tracing::info!(
            participants = self.combat.participants().len(),
            "combat started"
        );
        let mut last_turn: Option<(ParticipantId, u64)> = None;

        loop {
            match self.combat.advance(self.rng.as_mut()) {
                CombatStep::Ended(outcome) => return Ok(self.close(outcome).await),
                CombatStep::AwaitAction(id) => {
                    let turn_key = (id, self.latest_turn_seq(id));
                    if last_turn != Some(turn_key) {
                        last_turn = Some(turn_key);
                        tracing::debug!(participant = %id, "turn started");
                        self.bus
                            .publish(SessionEvent::TurnStarted { participant: id });
                        if let Some(behavior) = self.behaviors.get_mut(&id) {
                            behavior.begin_turn();
                        }
                    }

                    let command = match self.behaviors.get_mut(&id) {
                        Some(behavior) => behavior.next_command(&self.combat, id),
                        None => {
                            let snapshot = self.combat.snapshot();
                            self.provider.provide_command(id, &snapshot).await?
                        }
                    };

                    match self
                        .combat
                        .apply_command(id, command.clone(), self.rng.as_mut())
                    {
                        Ok(()) => {
                            self.bus.publish(SessionEvent::Command {
                                participant: id,
                                command: command.clone(),
                            });
                            // Borrow only the pacer across the await; a
                            // `&self` held here would demand `Sync` from
                            // the boxed roll source and un-`Send` the
                            // whole future.
                            Self::pace(self.pacer.as_ref(), &command).await;
                        }
                        Err(err) => {
                            tracing::warn!(participant = %id, %err, "command rejected");
                            self.bus.publish(SessionEvent::CommandRejected {
                                participant: id,
                                reason: err.to_string(),
                            });
                            if self.behaviors.contains_key(&id) {
                                // A stuck policy must not wedge the session.
                                let _ = self.combat.apply_command(
                                    id,
                                    CombatCommand::Hold,
                                    self.rng.as_mut(),
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    fn latest_turn_seq(&self, id: ParticipantId) -> u64 {
        self.combat
            .participant(id)
            .and_then(|p| p.turn_history().last().map(|t| t.seq))
            .unwrap_or(0)
    }

    async fn pace(pacer: &dyn Pacer, command: &CombatCommand) {
        match command {
            CombatCommand::UseAttack { .. } | CombatCommand::UseAction { .. } => {
                pacer.wait_for_attack().await;
            }
            CombatCommand::Move(_) => pacer.wait_for_movement().await,
            _ => {}
        }
    }

    /// Runs the ending once: sinks, closing narration, outcome event.
    async fn close(&mut self, outcome: CombatOutcome) -> bool {
        let won = outcome.result == CombatResult::Victory;
        tracing::info!(result = ?outcome.result, "combat ended");

        let message = match outcome.result {
            CombatResult::Victory => {
                self.sinks.award_loot(&outcome);
                self.sinks.award_experience(&outcome);
                "You prevailed."
            }
            CombatResult::Defeat => "You were defeated.",
            CombatResult::Surrendered => "You surrendered.",
        };
        self.sinks.record_statistics(&outcome);
        for report in &outcome.reports {
            if !report.ammo_spent.is_empty() {
                self.sinks.reclaim_ammunition(report);
            }
        }
        self.sinks.notify(message);
        self.pacer.wait_for_narration(message).await;

        self.bus.publish(SessionEvent::Ended { outcome });
        won
    }
}

/// Builder for [`CombatSession`] with flexible configuration.
pub struct SessionBuilder {
    specs: Vec<ParticipantSpec>,
    config: CombatConfig,
    options: CombatOptions,
    rng: Option<Box<dyn Rng + Send>>,
    provider: Option<Box<dyn ActionProvider>>,
    pacer: Box<dyn Pacer>,
    sinks: Box<dyn OutcomeSinks>,
    policies: Vec<(ParticipantId, BehaviorPolicy)>,
    event_capacity: usize,
    command_buffer: usize,
}

impl SessionBuilder {
    fn new() -> Self {
        Self {
            specs: Vec::new(),
            config: CombatConfig::default(),
            options: CombatOptions::default(),
            rng: None,
            provider: None,
            pacer: Box::new(NoopPacer),
            sinks: Box::new(NoopSinks),
            policies: Vec::new(),
            event_capacity: 100,
            command_buffer: 32,
        }
    }

    /// Roster: player first, then opponents and allies.
    pub fn participants(mut self, specs: Vec<ParticipantSpec>) -> Self {
        self.specs = specs;
        self
    }

    pub fn config(mut self, config: CombatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(mut self, options: CombatOptions) -> Self {
        self.options = options;
        self
    }

    /// Seeds the default PCG roll source. Two sessions with the same seed
    /// and the same commands replay identically.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(Box::new(Pcg32::new(seed)));
        self
    }

    /// Replaces the roll source entirely (scripted tests).
    pub fn rng(mut self, rng: impl Rng + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Replaces the default channel-backed player provider.
    pub fn player_provider(mut self, provider: impl ActionProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    pub fn pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    pub fn sinks(mut self, sinks: impl OutcomeSinks + 'static) -> Self {
        self.sinks = Box::new(sinks);
        self
    }

    /// Overrides the behavior policy of one automated participant.
    pub fn policy(mut self, participant: ParticipantId, policy: BehaviorPolicy) -> Self {
        self.policies.push((participant, policy));
        self
    }

    /// Validates the roster and wires up the session.
    pub fn build(self) -> Result<(CombatSession, SessionHandle)> {
        let combat = Combat::new(self.specs, self.config, self.options)?;

        let (command_tx, command_rx) = mpsc::channel::<CombatCommand>(self.command_buffer);
        let provider: Box<dyn ActionProvider> = match self.provider {
            Some(provider) => provider,
            None => Box::new(ChannelProvider::new(command_rx)),
        };

        let mut policies: HashMap<ParticipantId, BehaviorPolicy> =
            self.policies.into_iter().collect();
        let behaviors = combat
            .participants()
            .iter()
            .filter(|p| p.automated)
            .map(|p| {
                let policy = policies.remove(&p.id).unwrap_or_default();
                (p.id, CombatBehavior::new(policy))
            })
            .collect();

        let rng = self
            .rng
            .unwrap_or_else(|| Box::new(Pcg32::new(rand::random())));

        let bus = EventBus::with_capacity(self.event_capacity);
        let handle = SessionHandle::new(command_tx, bus.clone());

        let session = CombatSession {
            combat,
            rng,
            provider,
            pacer: self.pacer,
            sinks: self.sinks,
            behaviors,
            bus,
        };
        Ok((session, handle))
    }
}
