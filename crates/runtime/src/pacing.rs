//! Injectable pacing between combat beats.
//!
//! The model resolves instantly; presentation needs time. A [`Pacer`] sits
//! between resolved commands so UIs can animate or narrate, while headless
//! callers and tests inject [`NoopPacer`] and run at full speed.

use std::time::Duration;

use async_trait::async_trait;

/// Async delays inserted between combat beats.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// After an attack or offensive action resolved.
    async fn wait_for_attack(&self);

    /// After a row change.
    async fn wait_for_movement(&self);

    /// After narratable text was emitted.
    async fn wait_for_narration(&self, text: &str);
}

/// Zero-delay pacer for headless sessions and tests.
pub struct NoopPacer;

#[async_trait]
impl Pacer for NoopPacer {
    async fn wait_for_attack(&self) {}

    async fn wait_for_movement(&self) {}

    async fn wait_for_narration(&self, _text: &str) {}
}

/// Wall-clock pacer backed by tokio timers.
pub struct DelayPacer {
    pub attack: Duration,
    pub movement: Duration,
    /// Per-character narration delay when no screen reader is attached.
    pub per_char: Duration,
    /// Fixed narration delay when a screen reader does the reading.
    pub narration: Duration,
    /// A screen reader paces narration itself, so text length is ignored.
    pub screen_reader: bool,
}

impl Default for DelayPacer {
    fn default() -> Self {
        Self {
            attack: Duration::from_millis(600),
            movement: Duration::from_millis(350),
            per_char: Duration::from_millis(35),
            narration: Duration::from_millis(900),
            screen_reader: false,
        }
    }
}

#[async_trait]
impl Pacer for DelayPacer {
    async fn wait_for_attack(&self) {
        tokio::time::sleep(self.attack).await;
    }

    async fn wait_for_movement(&self) {
        tokio::time::sleep(self.movement).await;
    }

    async fn wait_for_narration(&self, text: &str) {
        let delay = if self.screen_reader {
            self.narration
        } else {
            self.per_char.saturating_mul(text.len() as u32)
        };
        tokio::time::sleep(delay).await;
    }
}
