//! Combat actions.
//!
//! Higher-level abilities paid for in advantage points. The action kinds
//! are a closed tagged union dispatched by match: offensive actions wrap an
//! attack and fan out particles, defensive actions grant status effects to
//! the user.

use crate::attack::Attack;
use crate::effect::EffectGrant;
use crate::modifier::ParticleModifier;
use crate::participant::Participant;

/// Advantage price of an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdvantageCost {
    Points(u32),
    /// Requires a non-empty bar and consumes all of it.
    FullBar,
}

/// Index of an attack inside its owner's attack sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackRef {
    pub set: usize,
    pub attack: usize,
}

/// Behavior axis of an action.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionBody {
    /// Fires the referenced attack at the current target plus splash
    /// siblings within `splash_range` positions.
    Offensive {
        attack: AttackRef,
        splash_range: u32,
        /// Extra modifiers stamped onto every particle this action fires.
        modifiers: Vec<ParticleModifier>,
        /// Conditional status effects carried by every particle.
        effects: Vec<EffectGrant>,
    },
    /// Applies status effects to the user.
    Defensive { effects: Vec<EffectGrant> },
}

/// A combat action definition owned by one participant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatAction {
    pub name: String,
    pub cost: AdvantageCost,
    pub body: ActionBody,
}

impl CombatAction {
    pub fn offensive(
        name: impl Into<String>,
        cost: AdvantageCost,
        attack: AttackRef,
        splash_range: u32,
    ) -> Self {
        Self {
            name: name.into(),
            cost,
            body: ActionBody::Offensive {
                attack,
                splash_range,
                modifiers: Vec::new(),
                effects: Vec::new(),
            },
        }
    }

    pub fn defensive(
        name: impl Into<String>,
        cost: AdvantageCost,
        effects: Vec<EffectGrant>,
    ) -> Self {
        Self {
            name: name.into(),
            cost,
            body: ActionBody::Defensive { effects },
        }
    }

    pub fn with_modifiers(mut self, extra: Vec<ParticleModifier>) -> Self {
        if let ActionBody::Offensive { modifiers, .. } = &mut self.body {
            *modifiers = extra;
        }
        self
    }

    pub fn with_particle_effects(mut self, grants: Vec<EffectGrant>) -> Self {
        if let ActionBody::Offensive { effects, .. } = &mut self.body {
            *effects = grants;
        }
        self
    }

    /// Advantage gate: enough points for the price, or any points at all
    /// for a full-bar action.
    pub fn fulfills_advantage_requirements(&self, advantage: u32) -> bool {
        match self.cost {
            AdvantageCost::Points(cost) => advantage >= cost,
            AdvantageCost::FullBar => advantage > 0,
        }
    }

    /// Type-specific gate evaluated against the owner and the distance to
    /// its current target.
    ///
    /// A defensive action requires every effect it would apply to still be
    /// acceptable; an offensive action requires its attack to be usable at
    /// the target distance.
    pub fn fulfills_non_advantage_requirements(
        &self,
        owner: &Participant,
        target_distance: u32,
    ) -> bool {
        match &self.body {
            ActionBody::Defensive { effects } => effects
                .iter()
                .all(|grant| owner.effects.accepts(grant.kind)),
            ActionBody::Offensive { attack, .. } => self
                .resolve_attack_on(owner, *attack)
                .is_some_and(|a| a.usable_at(target_distance)),
        }
    }

    pub fn usable(&self, owner: &Participant, target_distance: u32) -> bool {
        self.fulfills_advantage_requirements(owner.advantage_points())
            && self.fulfills_non_advantage_requirements(owner, target_distance)
    }

    /// Deducts this action's price from the owner's bar.
    pub fn deduct_cost(&self, owner: &mut Participant) {
        match self.cost {
            AdvantageCost::Points(cost) => owner.remove_advantage_points(f64::from(cost)),
            AdvantageCost::FullBar => owner.drain_advantage_points(),
        }
    }

    fn resolve_attack_on<'a>(&self, owner: &'a Participant, attack: AttackRef) -> Option<&'a Attack> {
        owner.attack_sets.get(attack.set)?.get(attack.attack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::{Attack, AttackSet};
    use crate::config::CombatConfig;
    use crate::effect::{EffectGrant, EffectKind};
    use crate::participant::ActorSheet;
    use crate::state::{ParticipantId, Team};

    fn owner() -> Participant {
        let sheet = ActorSheet {
            name: "duelist".into(),
            max_health: 60,
            health: 60,
            protection: 0.0,
            speed: 2.0,
            initiative: 1.0,
            hit_melee_chance: 0.8,
            hit_ranged_chance: 0.6,
            evade_melee_chance: 0.2,
            evade_ranged_chance: 0.1,
            block_chance: 0.1,
            critical_hit_chance: 0.05,
            critical_hit_multiplier: 2.0,
            resilience: 1,
        };
        let mut p = Participant::new(
            ParticipantId(1),
            Team::Opposition,
            1,
            true,
            sheet,
            &CombatConfig::default(),
        );
        p.attack_sets = vec![AttackSet::single(Attack::melee("saber", 3.0, 7.0))];
        p
    }

    #[test]
    fn advantage_gate_handles_full_bar_sentinel() {
        let action = CombatAction::defensive("brace", AdvantageCost::FullBar, vec![]);
        assert!(!action.fulfills_advantage_requirements(0));
        assert!(action.fulfills_advantage_requirements(1));

        let priced = CombatAction::defensive("guard", AdvantageCost::Points(300), vec![]);
        assert!(!priced.fulfills_advantage_requirements(299));
        assert!(priced.fulfills_advantage_requirements(300));
    }

    #[test]
    fn full_bar_cost_drains_everything() {
        let mut p = owner();
        p.add_advantage_points(1234.0);
        let action = CombatAction::defensive("overdrive", AdvantageCost::FullBar, vec![]);
        action.deduct_cost(&mut p);
        assert_eq!(p.advantage_points(), 0);
    }

    #[test]
    fn offensive_usability_tracks_attack_range() {
        let p = owner();
        let action = CombatAction::offensive(
            "lunge",
            AdvantageCost::Points(0),
            AttackRef { set: 0, attack: 0 },
            0,
        );
        assert!(action.fulfills_non_advantage_requirements(&p, 1));
        assert!(!action.fulfills_non_advantage_requirements(&p, 3));
    }

    #[test]
    fn defensive_usability_requires_acceptable_effects() {
        let mut p = owner();
        let action = CombatAction::defensive(
            "dig in",
            AdvantageCost::Points(0),
            vec![EffectGrant::new(EffectKind::Braced, 2)],
        );
        assert!(action.fulfills_non_advantage_requirements(&p, 1));

        // Braced is replenishable, so re-application stays legal.
        p.effects.add(EffectKind::Braced, 2);
        assert!(action.fulfills_non_advantage_requirements(&p, 1));
    }
}
