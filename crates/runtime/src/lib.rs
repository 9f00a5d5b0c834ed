//! Async orchestration for the deterministic lane combat model.
//!
//! This crate wires the pure model from `lanefall-core` into a running
//! encounter: a session worker drives the turn rotation, automated
//! participants act through behavior policies, and the player's turns
//! suspend on an injected action provider. Consumers hold a
//! [`SessionHandle`] to submit commands and stream events.
//!
//! Modules are organized by responsibility:
//! - [`session`] hosts the worker and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides the topic-based event bus
//! - [`behavior`] implements the automated participant policies
//! - [`pacing`] and [`sinks`] are the presentation-facing seams

pub mod api;
pub mod behavior;
pub mod events;
pub mod pacing;
pub mod session;
pub mod sinks;

pub use api::{
    ActionProvider, ChannelProvider, Result, ScriptedProvider, SessionError, SessionHandle,
};
pub use behavior::{ActionPreference, BehaviorPolicy, CombatBehavior, SubBehavior};
pub use events::{EventBus, SessionEvent, Topic};
pub use pacing::{DelayPacer, NoopPacer, Pacer};
pub use session::{CombatSession, SessionBuilder};
pub use sinks::{NoopSinks, OutcomeSinks};
