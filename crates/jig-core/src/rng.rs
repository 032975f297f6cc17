//! Seeded random source for a generation run
//!
//! Uses a seeded ChaCha RNG so that a seed and a configuration always
//! reproduce the same layout.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Layout random number generator
///
/// Wraps ChaCha8Rng and remembers the seed it was created from so the
/// run can report it.
#[derive(Debug, Clone)]
pub struct LayoutRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl LayoutRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a new RNG with a random seed
    pub fn from_entropy() -> Self {
        let seed = rand::random();
        Self::new(seed)
    }

    /// Get the seed used to create this RNG
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns 0..n-1
    ///
    /// Returns 0 if n is 0.
    pub fn rn2(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// Returns true with probability `p`
    ///
    /// `p` is clamped into [0, 1]; a draw is consumed either way.
    pub fn chance(&mut self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.rng.gen_bool(p)
    }

    /// Shuffle a slice in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.rn2(i as u32 + 1) as usize;
            items.swap(i, j);
        }
    }
}

impl Default for LayoutRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
