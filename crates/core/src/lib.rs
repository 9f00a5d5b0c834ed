//! Deterministic turn-based lane combat model.
//!
//! `lanefall-core` defines the canonical combat rules: the initiative-driven
//! turn schedule, the probabilistic particle pipeline, the action and
//! advantage point economies, status effects and passive abilities. All
//! state mutation flows through [`combat::Combat`]; randomness is injected
//! through [`rng::Rng`], so a seeded encounter replays identically.
pub mod action;
pub mod attack;
pub mod combat;
pub mod config;
pub mod effect;
pub mod error;
pub mod event;
pub mod modifier;
pub mod participant;
pub mod particle;
pub mod passive;
pub mod result;
pub mod rng;
pub mod state;
pub mod turn;

pub use action::{ActionBody, AdvantageCost, AttackRef, CombatAction};
pub use attack::{AmmoPool, Attack, AttackSet};
pub use combat::{
    AmmoSpent, Combat, CombatCommand, CombatOutcome, CombatResult, CombatSnapshot, CombatStep,
    MoveDirection, ParticipantReport, ParticipantSpec, ParticipantView,
};
pub use config::{CombatConfig, CombatOptions};
pub use effect::{EffectCondition, EffectGrant, EffectKind, EffectSet, StatusEffect};
pub use error::{CommandError, SetupError};
pub use event::{CombatEvent, EventLog};
pub use modifier::{
    calculate_range, calculate_scalar, ModifierOp, ModifierProperty, ParticleModifier,
};
pub use participant::{ActorSheet, DamageTaken, Participant};
pub use particle::{calculate_damage, chance_to_evade, Particle, ParticleInput};
pub use passive::{Passive, PassiveDirective, PassiveList};
pub use result::{ParticleResult, ResolutionOutcome, ResultFlags};
pub use rng::{Pcg32, Rng, SequenceRng};
pub use state::{row_distance, Engagement, ParticipantId, Team, Tick};
pub use turn::{turn_interval, Turn, TurnKind, TurnQueue};
