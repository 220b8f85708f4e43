//! Randomness for the masking primitives.
//!
//! Masking shares are drawn from a `ChaCha20` stream cipher used as a PRNG. A generator is
//! either seeded from system entropy, which is what a real participant does, or from an explicit
//! [`PrngSeed`] to make a round reproducible. The shared masking bound of a round is derived from
//! a PRNG seeded by a value every participant knows, so all participants agree on it without
//! communicating.

pub(crate) mod prng;

pub use self::prng::{derive_shared_value, generate_coordinates};

/// A seed for the share PRNG of a participant.
pub type PrngSeed = [u8; 32];
