//! Injectable roll source for the probabilistic resolution pipeline.
//!
//! Every chance check in the combat model draws from a [`Rng`] supplied by
//! the caller. Given the same seed the whole encounter replays identically,
//! which is what the scripted tests and the AI fixtures rely on.

/// Source of random rolls for combat resolution.
///
/// Implementations must be deterministic: the same starting state must
/// produce the same sequence of values.
pub trait Rng {
    /// Next raw 32-bit value.
    fn next_u32(&mut self) -> u32;

    /// Uniform roll in `[0, 1)`.
    ///
    /// This is the unit used by every chance comparison (hit, block,
    /// evade, critical).
    fn roll(&mut self) -> f64 {
        f64::from(self.next_u32()) / (f64::from(u32::MAX) + 1.0)
    }

    /// Uniform value in `[min, max]`.
    fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        min + self.roll() * (max - min)
    }
}

/// PCG random number generator (Permuted Congruential Generator).
///
/// PCG-XSH-RR: 32-bit output from 64-bit state. Small, fast, and of good
/// statistical quality, which is more than enough for combat rolls.
///
/// # References
///
/// - PCG paper: <https://www.pcg-random.org/>
#[derive(Clone, Copy, Debug)]
pub struct Pcg32 {
    state: u64,
}

impl Pcg32 {
    /// PCG multiplier constant.
    const MULTIPLIER: u64 = 6364136223846793005;

    /// PCG increment constant.
    const INCREMENT: u64 = 1442695040888963407;

    /// Creates a generator from a seed.
    pub fn new(seed: u64) -> Self {
        // One warm-up step so adjacent seeds diverge immediately.
        Self {
            state: Self::step(seed ^ Self::INCREMENT),
        }
    }

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    /// XSH-RR output function (xorshift high, random rotate).
    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl Rng for Pcg32 {
    fn next_u32(&mut self) -> u32 {
        self.state = Self::step(self.state);
        Self::output(self.state)
    }
}

/// Replays a scripted sequence of unit-interval rolls.
///
/// Once the script is exhausted every further roll returns the final value.
/// Intended for tests that need to force a specific pipeline branch
/// (guaranteed hit, forced block, boundary criticals).
#[derive(Clone, Debug, Default)]
pub struct SequenceRng {
    rolls: Vec<f64>,
    cursor: usize,
}

impl SequenceRng {
    pub fn new(rolls: Vec<f64>) -> Self {
        Self { rolls, cursor: 0 }
    }
}

impl Rng for SequenceRng {
    fn next_u32(&mut self) -> u32 {
        (self.roll() * (f64::from(u32::MAX) + 1.0)) as u32
    }

    fn roll(&mut self) -> f64 {
        let value = self
            .rolls
            .get(self.cursor)
            .or_else(|| self.rolls.last())
            .copied()
            .unwrap_or(0.5);
        self.cursor += 1;
        value
    }
}
