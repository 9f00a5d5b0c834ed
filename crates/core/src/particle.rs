//! Particle engine.
//!
//! A particle is one attack/ability instance against one target. It
//! snapshots its inputs at creation time, accumulates modifiers from the
//! action, status effects and passives, and resolves through the ordered
//! probabilistic pipeline: hit, block, evade, critical, damage, protection,
//! conditional status effects. Each stage may short-circuit the remainder
//! via [`ResolutionOutcome`]; a particle never outlives its single
//! resolution.

use crate::config::CombatConfig;
use crate::effect::EffectGrant;
use crate::event::CombatEvent;
use crate::modifier::{calculate_range, calculate_scalar, ModifierProperty, ParticleModifier};
use crate::participant::Participant;
use crate::result::{ParticleResult, ResolutionOutcome, ResultFlags};
use crate::rng::Rng;
use crate::state::{row_distance, Engagement, ParticipantId};

/// Derived evade chance: the receiver's evade stat reduced by the sender's
/// hit stat, clamped to `[0, EVADE_CHANCE_CAP]`.
pub fn chance_to_evade(sender_hit: f64, receiver_evade: f64) -> f64 {
    (receiver_evade - sender_hit).clamp(0.0, CombatConfig::EVADE_CHANCE_CAP)
}

/// Rolls damage for a range and determines criticality.
///
/// The roll is uniform in `[min, max]`. For a spread range the hit is
/// critical when the roll lands in the top `crit_chance` fraction; for a
/// fixed range (`max == min`) criticality is a direct Bernoulli draw.
/// Critical damage is `floor(roll * multiplier)`, otherwise `floor(roll)`.
pub fn calculate_damage(
    range: (f64, f64),
    crit_chance: f64,
    crit_multiplier: f64,
    rng: &mut dyn Rng,
) -> (u32, bool) {
    let (min, max) = range;
    let roll = rng.range_f64(min, max);

    let critical = if max > min {
        let threshold = (max - min) * (1.0 - crit_chance) + min;
        crit_chance > 0.0 && roll >= threshold
    } else {
        crit_chance > rng.roll()
    };

    let damage = if critical {
        (roll * crit_multiplier).floor()
    } else {
        roll.floor()
    };

    (damage.max(0.0) as u32, critical)
}

/// Immutable input snapshot taken when the particle is created.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticleInput {
    pub damage: (f64, f64),
    pub distance: u32,
    pub chance_to_hit: f64,
    pub chance_to_block: f64,
    pub chance_to_evade: f64,
    pub chance_to_critical_hit: f64,
    pub critical_hit_multiplier: f64,
    pub protection: f64,
}

/// One firing of an attack/ability against one target.
#[derive(Clone, Debug)]
pub struct Particle {
    pub sender: ParticipantId,
    pub receiver: ParticipantId,
    input: ParticleInput,
    modifiers: Vec<ParticleModifier>,
    effects: Vec<EffectGrant>,
    result: ParticleResult,
}

impl Particle {
    /// Snapshots all inputs from the two participants.
    ///
    /// Status-effect modifiers on both sides are folded in here; passive
    /// hook modifiers are pushed by the orchestrator before firing.
    pub fn new(sender: &Participant, receiver: &Participant, damage: (f64, f64)) -> Self {
        let distance = row_distance(sender.row, receiver.row);
        let engagement = Engagement::from_distance(distance);
        let sender_hit = sender.sheet.hit_chance(engagement);

        let input = ParticleInput {
            damage,
            distance,
            chance_to_hit: sender_hit,
            chance_to_block: receiver.sheet.block_chance,
            chance_to_evade: chance_to_evade(
                sender_hit,
                receiver.sheet.evade_chance(engagement),
            ),
            chance_to_critical_hit: sender.sheet.critical_hit_chance,
            critical_hit_multiplier: sender.sheet.critical_hit_multiplier,
            protection: receiver.sheet.protection,
        };

        let mut modifiers = Vec::new();
        for effect in sender.effects.iter() {
            modifiers.extend(effect.kind.cast_modifier());
        }
        for effect in receiver.effects.iter() {
            modifiers.extend(effect.kind.receive_modifier());
        }

        Self {
            sender: sender.id,
            receiver: receiver.id,
            input,
            modifiers,
            effects: Vec::new(),
            result: ParticleResult::default(),
        }
    }

    pub fn with_effects(mut self, effects: Vec<EffectGrant>) -> Self {
        self.effects = effects;
        self
    }

    pub fn push_modifier(&mut self, modifier: ParticleModifier) {
        self.modifiers.push(modifier);
    }

    pub fn push_modifiers(&mut self, modifiers: &[ParticleModifier]) {
        self.modifiers.extend_from_slice(modifiers);
    }

    pub fn input(&self) -> &ParticleInput {
        &self.input
    }

    pub fn result(&self) -> &ParticleResult {
        &self.result
    }

    /// The snapshot with all modifiers collapsed in.
    pub fn effective_input(&self) -> ParticleInput {
        let m = &self.modifiers;
        ParticleInput {
            damage: calculate_range(self.input.damage, m),
            distance: self.input.distance,
            chance_to_hit: calculate_scalar(
                self.input.chance_to_hit,
                m,
                ModifierProperty::ChanceToHit,
            ),
            chance_to_block: calculate_scalar(
                self.input.chance_to_block,
                m,
                ModifierProperty::ChanceToBlock,
            ),
            chance_to_evade: calculate_scalar(
                self.input.chance_to_evade,
                m,
                ModifierProperty::ChanceToEvade,
            ),
            chance_to_critical_hit: calculate_scalar(
                self.input.chance_to_critical_hit,
                m,
                ModifierProperty::ChanceToCriticalHit,
            ),
            critical_hit_multiplier: calculate_scalar(
                self.input.critical_hit_multiplier,
                m,
                ModifierProperty::CriticalHitMultiplier,
            ),
            protection: calculate_scalar(self.input.protection, m, ModifierProperty::Protection),
        }
    }

    /// Resolves the particle against the receiver.
    ///
    /// Mutates only the receiver (health, advantage, effects, events); the
    /// sender's reactions are driven by the orchestrator from the returned
    /// result.
    pub fn fire(&mut self, receiver: &mut Participant, rng: &mut dyn Rng) -> &ParticleResult {
        let effective = self.effective_input();

        let outcome = self.resolve_chance_stages(&effective, receiver, rng);
        match outcome {
            ResolutionOutcome::Missed => {
                self.result.flags |= ResultFlags::MISSED;
                receiver.events.push(CombatEvent::Missed { by: self.sender });
            }
            ResolutionOutcome::Blocked => {
                self.result.flags |= ResultFlags::BLOCKED;
                receiver.add_advantage_points(
                    CombatConfig::BLOCK_ADVANTAGE_BASE
                        + CombatConfig::BLOCK_ADVANTAGE_PER_RESILIENCE
                            * f64::from(receiver.sheet.resilience),
                );
                receiver.events.push(CombatEvent::Blocked { by: self.sender });
            }
            ResolutionOutcome::Evaded => {
                self.result.flags |= ResultFlags::EVADED;
                receiver.add_advantage_points(CombatConfig::EVADE_ADVANTAGE);
                receiver.events.push(CombatEvent::Evaded { by: self.sender });
            }
            ResolutionOutcome::Hit => {
                self.resolve_damage(&effective, receiver, rng);
            }
        }

        // Conditional effects are attempted whatever the outcome was, as
        // long as the receiver can still be affected.
        if receiver.in_fighting_shape() {
            self.resolve_effects(receiver);
        }

        &self.result
    }

    fn resolve_chance_stages(
        &self,
        effective: &ParticleInput,
        _receiver: &Participant,
        rng: &mut dyn Rng,
    ) -> ResolutionOutcome {
        if rng.roll() > effective.chance_to_hit {
            return ResolutionOutcome::Missed;
        }
        if effective.chance_to_block > rng.roll() {
            return ResolutionOutcome::Blocked;
        }
        if effective.chance_to_evade > rng.roll() {
            return ResolutionOutcome::Evaded;
        }
        ResolutionOutcome::Hit
    }

    fn resolve_damage(
        &mut self,
        effective: &ParticleInput,
        receiver: &mut Participant,
        rng: &mut dyn Rng,
    ) {
        let (min, max) = effective.damage;
        if max <= 0.0 {
            return;
        }

        let (rolled, critical) = calculate_damage(
            (min, max),
            effective.chance_to_critical_hit,
            effective.critical_hit_multiplier,
            rng,
        );
        if critical {
            self.result.flags |= ResultFlags::CRITICAL;
        }

        let protection = effective.protection.max(0.0).floor() as u32;
        let inflicted = rolled.saturating_sub(protection);

        if inflicted == 0 && rolled > 0 {
            self.result.flags |= ResultFlags::PROTECTED;
        }

        let taken = receiver.take_damage(inflicted);
        self.result.inflicted_damage = taken.applied;

        receiver.events.push(CombatEvent::Damaged {
            by: self.sender,
            amount: taken.applied,
            critical,
            protected: self.result.is_protected(),
        });
        if taken.defeated {
            receiver.events.push(CombatEvent::Defeated);
        }
    }

    fn resolve_effects(&mut self, receiver: &mut Participant) {
        for grant in &self.effects {
            if !grant.condition.evaluate(&self.result) {
                continue;
            }
            if receiver.effects.add(grant.kind, grant.duration_turns) {
                if !self.result.applied_effects.is_full() {
                    self.result.applied_effects.push(grant.kind);
                }
                receiver
                    .events
                    .push(CombatEvent::EffectApplied { effect: grant.kind });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConfig;
    use crate::effect::{EffectCondition, EffectKind};
    use crate::participant::ActorSheet;
    use crate::rng::{Pcg32, SequenceRng};
    use crate::state::{ParticipantId, Team};

    fn sheet() -> ActorSheet {
        ActorSheet {
            name: "fixture".into(),
            max_health: 100,
            health: 100,
            protection: 0.0,
            speed: 2.0,
            initiative: 1.0,
            hit_melee_chance: 0.9,
            hit_ranged_chance: 0.7,
            evade_melee_chance: 0.0,
            evade_ranged_chance: 0.0,
            block_chance: 0.0,
            critical_hit_chance: 0.0,
            critical_hit_multiplier: 2.0,
            resilience: 2,
        }
    }

    fn pair() -> (Participant, Participant) {
        let config = CombatConfig::default();
        let sender = Participant::new(
            ParticipantId(0),
            Team::Player,
            0,
            false,
            sheet(),
            &config,
        );
        let receiver = Participant::new(
            ParticipantId(1),
            Team::Opposition,
            1,
            true,
            sheet(),
            &config,
        );
        (sender, receiver)
    }

    #[test]
    fn evade_chance_is_clamped() {
        assert!((chance_to_evade(0.9, 0.95) - 0.05).abs() < 1e-12);
        assert_eq!(chance_to_evade(0.0, 0.0), 0.0);
        assert_eq!(chance_to_evade(0.0, 2.0), CombatConfig::EVADE_CHANCE_CAP);
        assert_eq!(chance_to_evade(1.0, 0.2), 0.0);
    }

    #[test]
    fn spread_range_with_full_crit_chance_always_crits() {
        let mut rng = Pcg32::new(99);
        for _ in 0..200 {
            let (damage, critical) = calculate_damage((1.0, 10.0), 1.0, 2.0, &mut rng);
            assert!(critical);
            // floor(roll * 2) for roll in [1, 10]
            assert!((2..=20).contains(&damage));
        }
    }

    #[test]
    fn spread_range_with_zero_crit_chance_never_crits() {
        let mut rng = Pcg32::new(7);
        for _ in 0..200 {
            let (_, critical) = calculate_damage((1.0, 10.0), 0.0, 2.0, &mut rng);
            assert!(!critical);
        }
    }

    #[test]
    fn fixed_range_uses_bernoulli_crit() {
        // Fixed 5 damage: no damage roll is drawn, the single roll is the
        // Bernoulli criticality draw.
        let mut always = SequenceRng::new(vec![0.1]);
        let (damage, critical) = calculate_damage((5.0, 5.0), 0.5, 2.0, &mut always);
        assert!(critical);
        assert_eq!(damage, 10);

        let mut never = SequenceRng::new(vec![0.9]);
        let (damage, critical) = calculate_damage((5.0, 5.0), 0.5, 2.0, &mut never);
        assert!(!critical);
        assert_eq!(damage, 5);
    }

    #[test]
    fn miss_short_circuits_damage_but_not_always_effects() {
        let (sender, mut receiver) = pair();
        let mut particle = Particle::new(&sender, &receiver, (4.0, 6.0)).with_effects(vec![
            EffectGrant::new(EffectKind::Dazed, 2),
            EffectGrant::new(EffectKind::Bleeding, 2).when(EffectCondition::OnDamage),
        ]);

        // Hit roll of 0.95 > 0.9 chance => miss.
        let mut rng = SequenceRng::new(vec![0.95]);
        let result = particle.fire(&mut receiver, &mut rng).clone();

        assert_eq!(result.outcome(), ResolutionOutcome::Missed);
        assert_eq!(result.inflicted_damage, 0);
        assert_eq!(receiver.sheet.health, 100);
        // The unconditional effect still lands; the damage-gated one does not.
        assert!(receiver.effects.has(EffectKind::Dazed));
        assert!(!receiver.effects.has(EffectKind::Bleeding));
    }

    #[test]
    fn block_grants_resilience_scaled_advantage() {
        let (sender, mut receiver) = pair();
        receiver.sheet.block_chance = 1.0;
        let mut particle = Particle::new(&sender, &receiver, (4.0, 6.0));

        // Hit roll passes, block roll is consumed and always under 1.0.
        let mut rng = SequenceRng::new(vec![0.1, 0.5]);
        let result = particle.fire(&mut receiver, &mut rng).clone();

        assert_eq!(result.outcome(), ResolutionOutcome::Blocked);
        // 150 + 75 * resilience(2) = 300
        assert_eq!(receiver.advantage_points(), 300);
    }

    #[test]
    fn evade_grants_flat_advantage() {
        let (mut sender, mut receiver) = pair();
        sender.sheet.hit_melee_chance = 0.5;
        receiver.sheet.evade_melee_chance = 1.0;
        let mut particle = Particle::new(&sender, &receiver, (4.0, 6.0));

        // hit passes (0.1 <= 0.5), block skipped (chance 0), evade 0.5 > 0.2.
        let mut rng = SequenceRng::new(vec![0.1, 0.0, 0.2]);
        let result = particle.fire(&mut receiver, &mut rng).clone();

        assert_eq!(result.outcome(), ResolutionOutcome::Evaded);
        assert_eq!(receiver.advantage_points(), 150);
    }

    #[test]
    fn protection_can_absorb_the_whole_roll() {
        let (sender, mut receiver) = pair();
        receiver.sheet.protection = 50.0;
        let mut particle = Particle::new(&sender, &receiver, (4.0, 6.0));

        let mut rng = SequenceRng::new(vec![0.0, 0.5]);
        let result = particle.fire(&mut receiver, &mut rng).clone();

        assert_eq!(result.outcome(), ResolutionOutcome::Hit);
        assert!(result.is_protected());
        assert_eq!(result.inflicted_damage, 0);
        assert_eq!(receiver.sheet.health, 100);
    }

    #[test]
    fn snapshot_is_taken_at_creation() {
        let (sender, receiver) = pair();
        let particle = Particle::new(&sender, &receiver, (4.0, 6.0));

        // Melee engagement at distance 1.
        assert_eq!(particle.input().distance, 1);
        assert_eq!(particle.input().chance_to_hit, 0.9);
        assert_eq!(particle.input().protection, 0.0);
    }
}
