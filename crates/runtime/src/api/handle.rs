//! Cloneable façade for interacting with a running session.
//!
//! [`SessionHandle`] hides the channel plumbing: UIs submit player
//! commands through it and stream events from specific topics.

use tokio::sync::{broadcast, mpsc};

use lanefall_core::CombatCommand;

use super::errors::{Result, SessionError};
use crate::events::{EventBus, SessionEvent, Topic};

/// Client-facing handle to a combat session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<CombatCommand>,
    bus: EventBus,
}

impl SessionHandle {
    pub(crate) fn new(commands: mpsc::Sender<CombatCommand>, bus: EventBus) -> Self {
        Self { commands, bus }
    }

    /// Submits a command for the player's turn.
    ///
    /// The session only consumes commands while the player holds the
    /// active turn; submissions queue up until then.
    pub async fn submit(&self, command: CombatCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::CommandChannelClosed)
    }

    /// Subscribes to events from one topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe(topic)
    }
}
