//! Topic-based event bus.
//!
//! Consumers subscribe to specific topics and only receive events they
//! care about. Publishing is best-effort: an event on a topic without
//! subscribers is dropped.

use tokio::sync::broadcast;

use super::types::{SessionEvent, Topic};

/// Topic-based broadcast bus. Cheap to clone; clones share channels.
#[derive(Clone)]
pub struct EventBus {
    combat: broadcast::Sender<SessionEvent>,
    turn: broadcast::Sender<SessionEvent>,
    outcome: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity per topic.
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a bus with the given capacity per topic.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            combat: broadcast::channel(capacity).0,
            turn: broadcast::channel(capacity).0,
            outcome: broadcast::channel(capacity).0,
        }
    }

    fn channel(&self, topic: Topic) -> &broadcast::Sender<SessionEvent> {
        match topic {
            Topic::Combat => &self.combat,
            Topic::Turn => &self.turn,
            Topic::Outcome => &self.outcome,
        }
    }

    /// Publishes an event to its topic.
    pub fn publish(&self, event: SessionEvent) {
        let topic = event.topic();
        if self.channel(topic).send(event).is_err() {
            // No subscribers on this topic; normal, not an error.
            tracing::trace!(?topic, "no subscribers for topic");
        }
    }

    /// Subscribes to one topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SessionEvent> {
        self.channel(topic).subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanefall_core::{CombatCommand, ParticipantId};

    #[tokio::test]
    async fn subscribers_only_see_their_topic() {
        let bus = EventBus::new();
        let mut turn_rx = bus.subscribe(Topic::Turn);
        let mut combat_rx = bus.subscribe(Topic::Combat);

        bus.publish(SessionEvent::TurnStarted {
            participant: ParticipantId::PLAYER,
        });
        bus.publish(SessionEvent::Command {
            participant: ParticipantId::PLAYER,
            command: CombatCommand::Hold,
        });

        assert!(matches!(
            turn_rx.recv().await,
            Ok(SessionEvent::TurnStarted { .. })
        ));
        assert!(matches!(
            combat_rx.recv().await,
            Ok(SessionEvent::Command { .. })
        ));
        assert!(turn_rx.try_recv().is_err());
    }
}
