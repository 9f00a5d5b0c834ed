//! Particle modifiers.
//!
//! A modifier is a single numeric adjustment to one property of a particle's
//! input snapshot. Passives, status effects, and actions push modifiers onto
//! a particle before it fires; [`calculate_scalar`]/[`calculate_range`]
//! collapse them into the effective value.
//!
//! # Application order
//!
//! Non-`Set` modifiers apply first, in declaration order; `Set` modifiers
//! apply afterwards, also in declaration order, each overwriting the running
//! value outright (the last `Set` wins).
//!
//! `Factor` is additive **on the original input**, not the running total:
//! two `Factor(1.5)` on a base of 5 yield `5 + 2.5 + 2.5 = 10`, never
//! `5 * 1.5 * 1.5`. This keeps stacked percentage bonuses linear.

/// Property of the particle input a modifier adjusts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierProperty {
    /// Damage range; terms and factors apply to both ends.
    Damage,
    ChanceToHit,
    ChanceToBlock,
    ChanceToEvade,
    ChanceToCriticalHit,
    CriticalHitMultiplier,
    Protection,
}

/// How the adjustment combines with the input.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierOp {
    /// Flat addition.
    Term(f64),
    /// Adds `(factor - 1) * original` to the running value.
    Factor(f64),
    /// Overwrites the running value.
    Set(f64),
}

/// A single numeric adjustment to one particle property.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticleModifier {
    pub property: ModifierProperty,
    pub op: ModifierOp,
}

impl ParticleModifier {
    pub fn term(property: ModifierProperty, value: f64) -> Self {
        Self {
            property,
            op: ModifierOp::Term(value),
        }
    }

    pub fn factor(property: ModifierProperty, value: f64) -> Self {
        Self {
            property,
            op: ModifierOp::Factor(value),
        }
    }

    pub fn set(property: ModifierProperty, value: f64) -> Self {
        Self {
            property,
            op: ModifierOp::Set(value),
        }
    }
}

/// Collapses all modifiers for a scalar property into its effective value.
pub fn calculate_scalar(
    original: f64,
    modifiers: &[ParticleModifier],
    property: ModifierProperty,
) -> f64 {
    let mut output = original;

    for modifier in relevant(modifiers, property, false) {
        match modifier.op {
            ModifierOp::Term(value) => output += value,
            ModifierOp::Factor(factor) => output += (factor - 1.0) * original,
            ModifierOp::Set(_) => unreachable!("set modifiers are filtered out"),
        }
    }
    for modifier in relevant(modifiers, property, true) {
        if let ModifierOp::Set(value) = modifier.op {
            output = value;
        }
    }

    output
}

/// Collapses all modifiers for the damage range. Terms and factors apply to
/// both ends relative to their own original; a `Set` collapses the range to
/// a fixed value.
pub fn calculate_range(
    original: (f64, f64),
    modifiers: &[ParticleModifier],
) -> (f64, f64) {
    let (min, max) = original;
    let mut out = original;

    for modifier in relevant(modifiers, ModifierProperty::Damage, false) {
        match modifier.op {
            ModifierOp::Term(value) => {
                out.0 += value;
                out.1 += value;
            }
            ModifierOp::Factor(factor) => {
                out.0 += (factor - 1.0) * min;
                out.1 += (factor - 1.0) * max;
            }
            ModifierOp::Set(_) => unreachable!("set modifiers are filtered out"),
        }
    }
    for modifier in relevant(modifiers, ModifierProperty::Damage, true) {
        if let ModifierOp::Set(value) = modifier.op {
            out = (value, value);
        }
    }

    out
}

fn relevant(
    modifiers: &[ParticleModifier],
    property: ModifierProperty,
    set_pass: bool,
) -> impl Iterator<Item = &ParticleModifier> {
    modifiers
        .iter()
        .filter(move |m| m.property == property)
        .filter(move |m| matches!(m.op, ModifierOp::Set(_)) == set_pass)
}
