//! Status effect system for participants.
//!
//! Effects are temporary conditions counted down in turns. Application
//! semantics depend on the effect kind: a stackable effect gains another
//! instance, an extendable one lengthens its remaining duration, a
//! replenishable one resets it, and anything else is ignored while already
//! present.

use arrayvec::ArrayVec;

use crate::config::CombatConfig;
use crate::modifier::{ModifierProperty, ParticleModifier};
use crate::result::{ParticleResult, ResultFlags};

/// Closed set of status effects known to the combat model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectKind {
    /// Defensive posture, grants extra block chance.
    GuardUp,
    /// Damage over time from an open wound. Stacks.
    Bleeding,
    /// Reduced hit chance.
    Dazed,
    /// Reduced evade chance.
    Winded,
    /// Raised protection.
    Braced,
}

impl EffectKind {
    /// Multiple instances may coexist.
    pub fn stackable(self) -> bool {
        matches!(self, EffectKind::Bleeding)
    }

    /// Re-application lengthens the remaining duration.
    pub fn extendable(self) -> bool {
        matches!(self, EffectKind::Dazed | EffectKind::Winded)
    }

    /// Re-application resets the duration to the granted value.
    pub fn replenishable(self) -> bool {
        matches!(self, EffectKind::GuardUp | EffectKind::Braced)
    }

    /// Modifier contributed to particles the affected participant casts.
    pub fn cast_modifier(self) -> Option<ParticleModifier> {
        match self {
            EffectKind::Dazed => Some(ParticleModifier::term(ModifierProperty::ChanceToHit, -0.1)),
            _ => None,
        }
    }

    /// Modifier contributed to particles striking the affected participant.
    pub fn receive_modifier(self) -> Option<ParticleModifier> {
        match self {
            EffectKind::GuardUp => Some(ParticleModifier::term(
                ModifierProperty::ChanceToBlock,
                0.15,
            )),
            EffectKind::Braced => {
                Some(ParticleModifier::term(ModifierProperty::Protection, 5.0))
            }
            EffectKind::Winded => Some(ParticleModifier::term(
                ModifierProperty::ChanceToEvade,
                -0.1,
            )),
            _ => None,
        }
    }

    /// Damage dealt to the bearer at the start of its own turn, per
    /// instance.
    pub fn turn_start_damage(self) -> u32 {
        match self {
            EffectKind::Bleeding => 1,
            _ => 0,
        }
    }
}

/// An active effect instance with its remaining duration in turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffect {
    pub kind: EffectKind,
    pub remaining_turns: u32,
}

/// Predicate guarding a conditional effect grant, evaluated against the
/// particle's result after resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectCondition {
    Always,
    /// Only when the particle inflicted damage.
    OnDamage,
    /// Only on a critical hit.
    OnCritical,
    /// Only when the receiver blocked.
    OnBlocked,
}

impl EffectCondition {
    pub fn evaluate(self, result: &ParticleResult) -> bool {
        match self {
            EffectCondition::Always => true,
            EffectCondition::OnDamage => result.inflicted_damage > 0,
            EffectCondition::OnCritical => result.flags.contains(ResultFlags::CRITICAL),
            EffectCondition::OnBlocked => result.flags.contains(ResultFlags::BLOCKED),
        }
    }
}

/// One conditional effect application carried by an action or particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectGrant {
    pub kind: EffectKind,
    pub duration_turns: u32,
    pub condition: EffectCondition,
}

impl EffectGrant {
    pub fn new(kind: EffectKind, duration_turns: u32) -> Self {
        Self {
            kind,
            duration_turns,
            condition: EffectCondition::Always,
        }
    }

    pub fn when(mut self, condition: EffectCondition) -> Self {
        self.condition = condition;
        self
    }
}

/// Bounded set of active effects on one participant.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectSet {
    effects: ArrayVec<StatusEffect, { CombatConfig::MAX_STATUS_EFFECTS }>,
}

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    /// Whether a grant of this kind would do anything right now.
    ///
    /// A defensive action is only usable when every effect it applies
    /// passes this check.
    pub fn accepts(&self, kind: EffectKind) -> bool {
        !self.has(kind) || kind.stackable() || kind.extendable() || kind.replenishable()
    }

    /// Applies a grant. Returns true when the set changed.
    pub fn add(&mut self, kind: EffectKind, duration_turns: u32) -> bool {
        if let Some(existing) = self.effects.iter_mut().find(|e| e.kind == kind) {
            if kind.stackable() {
                // fall through to push a second instance below
            } else if kind.extendable() {
                existing.remaining_turns += duration_turns;
                return true;
            } else if kind.replenishable() {
                existing.remaining_turns = existing.remaining_turns.max(duration_turns);
                return true;
            } else {
                return false;
            }
        }

        if self.effects.is_full() {
            return false;
        }
        self.effects.push(StatusEffect {
            kind,
            remaining_turns: duration_turns,
        });
        true
    }

    pub fn remove(&mut self, kind: EffectKind) {
        self.effects.retain(|e| e.kind != kind);
    }

    /// Counts down every instance by one turn and drops the expired ones.
    pub fn tick_down(&mut self) {
        for effect in self.effects.iter_mut() {
            effect.remaining_turns = effect.remaining_turns.saturating_sub(1);
        }
        self.effects.retain(|e| e.remaining_turns > 0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
