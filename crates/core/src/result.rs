//! Particle result types and resolution outcome.

use arrayvec::ArrayVec;

use crate::config::CombatConfig;
use crate::effect::EffectKind;

/// Outcome of the chance stages of a particle resolution.
///
/// A non-[`Hit`](ResolutionOutcome::Hit) value short-circuits the rest of
/// the pipeline. This is expected, frequent control flow, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolutionOutcome {
    Hit,
    Missed,
    Blocked,
    Evaded,
}

bitflags::bitflags! {
    /// Flag set describing how one resolved particle played out.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ResultFlags: u8 {
        const MISSED    = 1 << 0;
        const BLOCKED   = 1 << 1;
        const EVADED    = 1 << 2;
        const CRITICAL  = 1 << 3;
        /// Protection absorbed a nonzero damage roll entirely.
        const PROTECTED = 1 << 4;
    }
}

/// The record of one resolved attack/ability instance against one target.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticleResult {
    pub flags: ResultFlags,

    /// Damage actually inflicted after protection.
    pub inflicted_damage: u32,

    /// Status effects that landed on the receiver, in application order.
    pub applied_effects: ArrayVec<EffectKind, { CombatConfig::MAX_STATUS_EFFECTS }>,
}

impl ParticleResult {
    pub fn outcome(&self) -> ResolutionOutcome {
        if self.flags.contains(ResultFlags::MISSED) {
            ResolutionOutcome::Missed
        } else if self.flags.contains(ResultFlags::BLOCKED) {
            ResolutionOutcome::Blocked
        } else if self.flags.contains(ResultFlags::EVADED) {
            ResolutionOutcome::Evaded
        } else {
            ResolutionOutcome::Hit
        }
    }

    pub fn is_critical(&self) -> bool {
        self.flags.contains(ResultFlags::CRITICAL)
    }

    pub fn is_protected(&self) -> bool {
        self.flags.contains(ResultFlags::PROTECTED)
    }

    /// True when the chance stages resolved to a hit, regardless of how
    /// much damage survived protection.
    pub fn connected(&self) -> bool {
        self.outcome() == ResolutionOutcome::Hit
    }
}
