//! Random sampling primitives shared by every generator
//!
//! Two building blocks live here:
//!
//! - [`WeightedTable`]: a categorical sampler over an explicit table of
//!   `(outcome, weight)` pairs. Probability tables (heart-rate step sizes,
//!   sleep-duration buckets, zone profiles) are declared as `const` data and
//!   sampled through this one type.
//! - [`day_stream`]: an independent ChaCha stream per (seed, day, component),
//!   which is what lets days be generated in parallel while staying
//!   byte-for-byte reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Categorical distribution over a static table of weighted outcomes
///
/// Weights need not sum to one; they are normalised at sampling time.
#[derive(Debug, Clone, Copy)]
pub struct WeightedTable<T: 'static> {
    entries: &'static [(T, f64)],
}

impl<T: Copy + PartialEq> WeightedTable<T> {
    /// Build a table. Empty tables are rejected at compile time for `const` tables.
    pub const fn new(entries: &'static [(T, f64)]) -> Self {
        assert!(!entries.is_empty(), "weighted table needs at least one outcome");
        Self { entries }
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w.max(0.0)).sum()
    }

    /// Normalised probability of `outcome`
    pub fn probability(&self, outcome: T) -> f64 {
        let total = self.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        self.entries
            .iter()
            .filter(|(o, _)| *o == outcome)
            .map(|(_, w)| w.max(0.0))
            .sum::<f64>()
            / total
    }

    /// Draw one outcome
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        let total = self.total_weight();
        let mut point = rng.gen::<f64>() * total;
        for &(outcome, weight) in self.entries {
            let weight = weight.max(0.0);
            if point < weight {
                return outcome;
            }
            point -= weight;
        }
        // Only reachable through floating-point residue at the top of the range
        self.entries[self.entries.len() - 1].0
    }
}

impl<T: Copy + PartialEq + Into<f64>> WeightedTable<T> {
    /// Expected value of a numeric table
    pub fn expected_value(&self) -> f64 {
        let total = self.total_weight();
        self.entries
            .iter()
            .map(|&(o, w)| o.into() * w.max(0.0))
            .sum::<f64>()
            / total
    }
}

/// Generator component owning a random stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Sleep = 1,
    HeartRate = 2,
    Activity = 3,
    Derived = 4,
    Exercise = 5,
}

/// Independent random stream for one component of one day
pub fn day_stream(seed: u64, day: u32, stream: Stream) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream((u64::from(day) << 8) | stream as u64);
    rng
}

/// Fresh seed for unseeded runs, kept within TOML's integer range
pub fn fresh_seed() -> u64 {
    rand::random::<u64>() >> 1
}

/// Round to a fixed number of decimal places
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// Uniform draw from a half-open float range, rounded to `dp` decimals
pub fn uniform_rounded<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64, dp: i32) -> f64 {
    round_dp(rng.gen_range(lo..hi), dp)
}
