//! PRNG utilities for the masking primitives.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [crypto module]: crate::crypto

use rand::{
    distributions::{Distribution, Uniform},
    SeedableRng,
};
use rand_chacha::ChaCha20Rng;

use crate::common::round_to_precision;

/// Generates `len` pseudo-random coordinates.
///
/// Draws independently from a uniform distribution over `[-bound, bound]` and rounds every draw
/// to the protocol precision.
///
/// # Panics
/// Panics if `bound` is negative or not finite.
pub fn generate_coordinates(prng: &mut ChaCha20Rng, bound: f64, len: usize) -> Vec<f64> {
    Uniform::new_inclusive(-bound, bound)
        .sample_iter(prng)
        .take(len)
        .map(round_to_precision)
        .collect()
}

/// Derives a value from a shared seed.
///
/// Draws from a uniform distribution over `[low, high]` with a PRNG seeded by `seed`, so that the
/// same seed always yields the same value.
///
/// # Panics
/// Panics if `low > high` or if either is not finite.
pub fn derive_shared_value(seed: u64, low: f64, high: f64) -> f64 {
    let mut prng = ChaCha20Rng::seed_from_u64(seed);
    Uniform::new_inclusive(low, high).sample(&mut prng)
}
