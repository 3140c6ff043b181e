//! Deterministic draw source.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through the single `DrawSource` owned by the run
//! context, seeded once from the base seed.
//!
//! Every helper below consumes exactly one draw and advances the draw
//! counter by one. Replaying the same seed through the same decision path
//! therefore reproduces the same sequence of outcomes.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// The run's one long-lived pseudo-random stream.
#[derive(Debug, Clone)]
pub struct DrawSource {
    seed:  u64,
    draws: u64,
    inner: Pcg64Mcg,
}

impl DrawSource {
    pub fn new(seed: u64) -> Self {
        let derived_seed = seed ^ 0x9e37_79b9_7f4a_7c15;
        Self {
            seed,
            draws: 0,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of draws consumed so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.draws += 1;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll an index in [0, n). `n` must be > 0.
    pub fn next_below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "n must be > 0");
        let idx = (self.next_f64() * n as f64) as usize;
        idx.min(n.saturating_sub(1))
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Pick an index with probability proportional to `weights`.
    /// Falls back to a uniform pick when the weights carry no mass.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        debug_assert!(!weights.is_empty(), "weights must not be empty");
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 || !total.is_finite() {
            return self.next_below(weights.len());
        }

        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        let mut last_positive = 0;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            cumulative += w;
            last_positive = i;
            if target < cumulative {
                return i;
            }
        }
        last_positive
    }
}
