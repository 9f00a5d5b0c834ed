//! Attacks and attack sets.
//!
//! An [`Attack`] wraps a raw weapon or innate strike: its damage range,
//! whether it engages at range, and an optional ammunition pool. Usability
//! is evaluated against the possessor's current distance to its target.

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attack {
    pub name: String,

    /// Damage range `{min, max}` rolled uniformly on a hit.
    pub damage: (f64, f64),

    /// Ranged attacks require distance > 1; melee requires distance == 1.
    pub ranged: bool,

    /// Ammunition backing this attack, if any. A ranged attack with an
    /// empty pool is unusable.
    pub ammo: Option<AmmoPool>,

    /// Advantage granted to the sender when the attack connects.
    pub advantage_on_hit: f64,
}

impl Attack {
    pub fn melee(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            damage: (min, max),
            ranged: false,
            ammo: None,
            advantage_on_hit: 0.0,
        }
    }

    pub fn ranged(name: impl Into<String>, min: f64, max: f64, ammo: AmmoPool) -> Self {
        Self {
            name: name.into(),
            damage: (min, max),
            ranged: true,
            ammo: Some(ammo),
            advantage_on_hit: 0.0,
        }
    }

    pub fn with_advantage_on_hit(mut self, advantage: f64) -> Self {
        self.advantage_on_hit = advantage;
        self
    }

    /// Range gate: melee wants adjacency, ranged wants anything further.
    pub fn in_range(&self, distance: u32) -> bool {
        if self.ranged {
            distance > 1
        } else {
            distance == 1
        }
    }

    pub fn has_ammo(&self) -> bool {
        self.ammo.as_ref().map_or(true, |pool| pool.remaining > 0)
    }

    /// Usable iff the target distance fits the engagement kind and any
    /// ammunition pool still has rounds.
    pub fn usable_at(&self, distance: u32) -> bool {
        self.in_range(distance) && self.has_ammo()
    }

    /// Consumes one round when the attack is ammunition-backed.
    pub fn spend_ammo(&mut self) {
        if let Some(pool) = self.ammo.as_mut() {
            pool.spend();
        }
    }
}

/// Ammunition pool linked to a ranged attack.
///
/// Spent rounds are tallied so the inventory collaborator can reclaim
/// recoverable projectiles (thrown weapons, arrows) after the encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmmoPool {
    pub remaining: u32,
    pub spent: u32,
    pub recoverable: bool,
}

impl AmmoPool {
    pub fn new(remaining: u32, recoverable: bool) -> Self {
        Self {
            remaining,
            spent: 0,
            recoverable,
        }
    }

    fn spend(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.spent += 1;
        }
    }
}

/// Attacks owned together, e.g. a pair of dual-wielded weapons.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackSet {
    attacks: Vec<Attack>,
}

impl AttackSet {
    pub fn new(attacks: Vec<Attack>) -> Self {
        Self { attacks }
    }

    pub fn single(attack: Attack) -> Self {
        Self {
            attacks: vec![attack],
        }
    }

    pub fn usable_at(&self, distance: u32) -> bool {
        self.attacks.iter().any(|a| a.usable_at(distance))
    }

    /// First usable member in declaration order.
    pub fn first_usable(&self, distance: u32) -> Option<usize> {
        self.attacks.iter().position(|a| a.usable_at(distance))
    }

    pub fn get(&self, index: usize) -> Option<&Attack> {
        self.attacks.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Attack> {
        self.attacks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attack> {
        self.attacks.iter()
    }
}
