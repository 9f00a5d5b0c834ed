//! Passive abilities and their hook points.
//!
//! Passives react at fixed phases of the combat flow: combat start/end,
//! turn start/end, around actions, and around particle cast/receive. Each
//! hook returns directives the orchestrator applies, so a passive never
//! needs a mutable handle on its own participant.
//!
//! The set is a closed enum dispatched by match; there is no virtual
//! hierarchy to override.

use arrayvec::ArrayVec;

use crate::config::CombatConfig;
use crate::modifier::{ModifierProperty, ParticleModifier};
use crate::result::ParticleResult;

/// Closed set of passive abilities.
#[derive(Clone, Copy, Debug, PartialEq, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Passive {
    /// Opens the encounter with a head start on the advantage bar.
    BattleReady { advantage: f64 },

    /// Heals at the start of the own turn while below a health fraction.
    SecondWind { threshold: f64, heal: u32 },

    /// Flat protection bonus against every received particle.
    Bulwark { protection_bonus: f64 },

    /// Gains advantage whenever an own particle lands a critical hit.
    Opportunist { advantage: f64 },

    /// Gains a trickle of advantage after every performed action.
    Momentum { advantage: f64 },
}

/// Instruction emitted by a passive hook for the orchestrator to apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PassiveDirective {
    /// Add advantage points to the passive's owner.
    GainAdvantage(f64),
    /// Heal the passive's owner.
    Heal(u32),
    /// Push a modifier onto the particle being prepared.
    AddModifier(ParticleModifier),
}

/// Bounded list of passives carried by one participant.
pub type PassiveList = ArrayVec<Passive, { CombatConfig::MAX_PASSIVES }>;

impl Passive {
    /// Pre-combat hook, run once before the first turn.
    pub fn on_combat_start(&self) -> Option<PassiveDirective> {
        match self {
            Passive::BattleReady { advantage } => {
                Some(PassiveDirective::GainAdvantage(*advantage))
            }
            _ => None,
        }
    }

    /// Post-combat hook, run once after the termination predicate fired.
    pub fn on_combat_end(&self) -> Option<PassiveDirective> {
        None
    }

    /// Pre-turn hook for the owner's own turn.
    pub fn on_turn_start(&self, health: u32, max_health: u32) -> Option<PassiveDirective> {
        match self {
            Passive::SecondWind { threshold, heal } => {
                let fraction = f64::from(health) / f64::from(max_health.max(1));
                (fraction < *threshold).then_some(PassiveDirective::Heal(*heal))
            }
            _ => None,
        }
    }

    /// Post-turn hook for the owner's own turn.
    pub fn on_turn_end(&self) -> Option<PassiveDirective> {
        None
    }

    /// Pre-action hook. Iterated last-to-first across the owner's passives
    /// so later-granted passives take precedence.
    pub fn on_pre_action(&self) -> Option<PassiveDirective> {
        None
    }

    /// Post-action hook.
    pub fn on_post_action(&self) -> Option<PassiveDirective> {
        match self {
            Passive::Momentum { advantage } => Some(PassiveDirective::GainAdvantage(*advantage)),
            _ => None,
        }
    }

    /// Hook on every particle the owner is about to cast.
    pub fn on_pre_cast(&self) -> Option<PassiveDirective> {
        None
    }

    /// Hook on every particle about to strike the owner.
    pub fn on_pre_receive(&self) -> Option<PassiveDirective> {
        match self {
            Passive::Bulwark { protection_bonus } => Some(PassiveDirective::AddModifier(
                ParticleModifier::term(ModifierProperty::Protection, *protection_bonus),
            )),
            _ => None,
        }
    }

    /// Hook after a particle the owner cast has resolved.
    pub fn on_post_cast(&self, result: &ParticleResult) -> Option<PassiveDirective> {
        match self {
            Passive::Opportunist { advantage } => result
                .is_critical()
                .then_some(PassiveDirective::GainAdvantage(*advantage)),
            _ => None,
        }
    }

    /// Hook after a particle has resolved against the owner.
    pub fn on_post_receive(&self, _result: &ParticleResult) -> Option<PassiveDirective> {
        None
    }
}
