//! Shared identity and time primitives for the combat state.

use std::fmt;

/// Stable arena index of a participant in the combat roster.
///
/// Targets and opponents are always addressed by id, never by reference,
/// so the roster stays an ordinary vector without ownership cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticipantId(pub u32);

impl ParticipantId {
    /// Reserved identifier for the player character. The roster is always
    /// built as `[player, opponents...]`.
    pub const PLAYER: Self = Self(0);

    #[inline]
    pub const fn is_player(self) -> bool {
        self.0 == Self::PLAYER.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the exactly two sides of an encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Team {
    Player,
    Opposition,
}

impl Team {
    /// The other side.
    pub fn opposing(self) -> Self {
        match self {
            Team::Player => Team::Opposition,
            Team::Opposition => Team::Player,
        }
    }
}

/// Discrete time unit of the turn timeline, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row distance between two lane positions.
#[inline]
pub fn row_distance(a: i32, b: i32) -> u32 {
    a.abs_diff(b)
}

/// Engagement kind derived from row distance: adjacent rows fight in
/// melee, anything further is ranged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Engagement {
    Melee,
    Ranged,
}

impl Engagement {
    pub fn from_distance(distance: u32) -> Self {
        if distance <= 1 {
            Engagement::Melee
        } else {
            Engagement::Ranged
        }
    }
}
