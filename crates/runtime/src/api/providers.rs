//! Asynchronous abstraction for sourcing combat commands.
//!
//! The session asks an [`ActionProvider`] for a command whenever the
//! non-automated player holds the active turn. Implementations can bridge
//! a UI channel, replay a scripted fixture, or compute commands directly.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use lanefall_core::{CombatCommand, CombatSnapshot, ParticipantId};

use super::errors::{Result, SessionError};

/// Source of commands for the player's turns.
///
/// Different implementations can handle:
/// - Human input bridged from a UI or CLI
/// - Scripted/replayed commands for tests
/// - Custom decision logic embedding the snapshot
#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// Produce one command for the acting participant.
    ///
    /// The session suspends the turn until this future resolves; a
    /// channel-backed provider simply waits for the UI.
    async fn provide_command(
        &self,
        participant: ParticipantId,
        snapshot: &CombatSnapshot,
    ) -> Result<CombatCommand>;
}

/// Feeds commands submitted through the session handle.
///
/// This is the default player provider: `provide_command` parks until the
/// UI pushes something into the channel.
pub struct ChannelProvider {
    commands: tokio::sync::Mutex<mpsc::Receiver<CombatCommand>>,
}

impl ChannelProvider {
    pub fn new(receiver: mpsc::Receiver<CombatCommand>) -> Self {
        Self {
            commands: tokio::sync::Mutex::new(receiver),
        }
    }
}

#[async_trait]
impl ActionProvider for ChannelProvider {
    async fn provide_command(
        &self,
        _participant: ParticipantId,
        _snapshot: &CombatSnapshot,
    ) -> Result<CombatCommand> {
        let mut commands = self.commands.lock().await;
        commands
            .recv()
            .await
            .ok_or(SessionError::CommandChannelClosed)
    }
}

/// Replays a fixed command script, then holds every further turn.
///
/// Testing fixture: drives deterministic end-to-end sessions without a UI.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<CombatCommand>>,
}

impl ScriptedProvider {
    pub fn new(commands: impl IntoIterator<Item = CombatCommand>) -> Self {
        Self {
            script: Mutex::new(commands.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ActionProvider for ScriptedProvider {
    async fn provide_command(
        &self,
        _participant: ParticipantId,
        _snapshot: &CombatSnapshot,
    ) -> Result<CombatCommand> {
        let command = match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(_) => None,
        };
        Ok(command.unwrap_or(CombatCommand::Hold))
    }
}
