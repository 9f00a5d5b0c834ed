//! Turn scheduling.
//!
//! Every participant owns a sequence of future turn timestamps derived from
//! its speed and initiative. The queue merges all sequences into one total
//! order: ascending timestamp, ties broken by insertion order. Rotation
//! always advances to the immediate successor of the currently active turn.

use std::collections::HashMap;

use crate::config::CombatConfig;
use crate::rng::Rng;
use crate::state::{ParticipantId, Tick};

/// How a turn's timestamp was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnKind {
    /// Initiative-derived first turn or interval-derived successor.
    Regular,
    /// Explicit timestamp seeded from a scripted turn order.
    Custom,
}

/// One scheduled activation of a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Turn {
    pub participant: ParticipantId,
    pub timestamp: Tick,
    /// Global insertion sequence; the tiebreaker for equal timestamps.
    pub seq: u64,
    pub kind: TurnKind,
}

/// Derived per-participant turn interval.
///
/// `speed_ms = 1000 / speed`, `interval = floor(speed_ms / 2 + speed_ms)`.
pub fn turn_interval(speed: f64) -> Tick {
    let speed_ms = 1000.0 / speed.max(f64::EPSILON);
    Tick((speed_ms / 2.0 + speed_ms).floor() as u64)
}

/// Merged turn queue over all participants.
#[derive(Clone, Debug, Default)]
pub struct TurnQueue {
    /// Upcoming turns, kept sorted by `(timestamp, seq)`.
    upcoming: Vec<Turn>,
    /// The turn whose participant is currently acting.
    current: Option<Turn>,
    /// Latest timestamp ever scheduled per participant; successive turns
    /// must stay strictly above it.
    last_scheduled: HashMap<ParticipantId, Tick>,
    next_seq: u64,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Turn> {
        self.current
    }

    /// Upcoming (not current) turns of one participant.
    pub fn upcoming_count(&self, id: ParticipantId) -> usize {
        self.upcoming.iter().filter(|t| t.participant == id).count()
    }

    /// The merged queue in activation order, for the UI snapshot.
    pub fn upcoming(&self) -> &[Turn] {
        &self.upcoming
    }

    /// Seeds a participant's first turn from its initiative.
    ///
    /// Delay is `interval / initiative`, jittered by up to
    /// [`CombatConfig::INITIAL_TURN_JITTER`] in either direction so equal
    /// stat lines do not produce a perfectly predictable opening order.
    pub fn schedule_initial(
        &mut self,
        id: ParticipantId,
        interval: Tick,
        initiative: f64,
        rng: &mut dyn Rng,
    ) {
        let base = interval.0 as f64 / initiative.max(f64::EPSILON);
        let jitter = (rng.roll() * 2.0 - 1.0) * CombatConfig::INITIAL_TURN_JITTER;
        let timestamp = Tick((base * (1.0 + jitter)).floor().max(0.0) as u64);
        self.insert(id, timestamp, TurnKind::Regular);
    }

    /// Seeds a custom turn with an explicit timestamp.
    pub fn schedule_custom(&mut self, id: ParticipantId, timestamp: Tick) {
        self.insert(id, timestamp, TurnKind::Custom);
    }

    /// Appends a regular turn: previous own timestamp plus the interval,
    /// bumped past the currently active turn so it cannot tie or precede
    /// it and silently skip.
    pub fn schedule_regular(&mut self, id: ParticipantId, interval: Tick) {
        let last_own = self.last_scheduled.get(&id).copied().unwrap_or(Tick::ZERO);
        let mut timestamp = last_own + interval.0.max(1);

        if let Some(current) = self.current {
            if timestamp <= current.timestamp {
                timestamp = current.timestamp + 1;
            }
        }
        // Monotonicity guard against zero intervals and custom seeds.
        if timestamp <= last_own {
            timestamp = last_own + 1;
        }

        self.insert(id, timestamp, TurnKind::Regular);
    }

    fn insert(&mut self, participant: ParticipantId, timestamp: Tick, kind: TurnKind) {
        let turn = Turn {
            participant,
            timestamp,
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;

        let entry = self
            .last_scheduled
            .entry(participant)
            .or_insert(Tick::ZERO);
        *entry = (*entry).max(timestamp);

        let at = self
            .upcoming
            .partition_point(|t| (t.timestamp, t.seq) <= (turn.timestamp, turn.seq));
        self.upcoming.insert(at, turn);
    }

    /// Advances to the immediate successor of the active turn (or the head
    /// of the queue when none is active). The consumed turn becomes
    /// current; the previous current turn has passed.
    pub fn rotate(&mut self) -> Option<Turn> {
        if self.upcoming.is_empty() {
            self.current = None;
            return None;
        }
        let next = self.upcoming.remove(0);
        self.current = Some(next);
        Some(next)
    }

    /// Discards all upcoming turns of a participant so it never re-enters
    /// the schedule. The current turn, if it belongs to the participant,
    /// is left in place.
    pub fn prune_upcoming(&mut self, id: ParticipantId) {
        self.upcoming.retain(|t| t.participant != id);
    }

    /// Drops the current marker without rotating (end of combat).
    pub fn clear_current(&mut self) {
        self.current = None;
    }
}
