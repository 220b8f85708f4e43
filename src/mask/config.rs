//! Masking configuration and masking bound selection.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use std::fmt;

use crate::{crypto::derive_shared_value, ProtocolError};

/// The masking bound used when none is configured.
pub const DEFAULT_MASKING_BOUND: f64 = 100.0;

/// The smallest masking bound a randomized configuration may derive.
pub const MIN_RANDOMIZED_BOUND: f64 = 1.0;

/// The largest supported masking bound.
///
/// Coordinates of up to this magnitude keep their four decimal places exactly enough in an `f64`
/// for the masks of a round to cancel out within the protocol precision.
pub const MAX_MASKING_BOUND: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
/// The bound `D` of the masking interval `[-D, D]`.
///
/// A masking bound is always strictly positive and at most [`MAX_MASKING_BOUND`].
pub struct MaskingBound(f64);

impl MaskingBound {
    /// Creates a masking bound.
    ///
    /// # Errors
    /// Fails if `bound` is not strictly positive or exceeds [`MAX_MASKING_BOUND`].
    pub fn new(bound: f64) -> Result<Self, ProtocolError> {
        if bound > 0.0 && bound <= MAX_MASKING_BOUND {
            Ok(Self(bound))
        } else {
            Err(ProtocolError::InvalidMaskingBound(bound))
        }
    }

    /// Gets the bound as a primitive value.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for MaskingBound {
    fn default() -> Self {
        Self(DEFAULT_MASKING_BOUND)
    }
}

impl fmt::Display for MaskingBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::convert::TryFrom<f64> for MaskingBound {
    type Error = ProtocolError;

    fn try_from(bound: f64) -> Result<Self, Self::Error> {
        Self::new(bound)
    }
}

impl From<MaskingBound> for f64 {
    fn from(bound: MaskingBound) -> Self {
        bound.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// A masking configuration.
///
/// In fixed mode the masking bound is `masking_bound` itself. In randomized mode the bound is
/// drawn from `[MIN_RANDOMIZED_BOUND, masking_bound]` by a PRNG seeded with `shared_seed`, which
/// every participant of a round knows.
pub struct MaskConfig {
    /// The fixed masking bound, or the ceiling of the randomized one.
    pub masking_bound: f64,
    /// Whether the masking bound is derived from the shared seed.
    pub randomize: bool,
    /// The seed shared by all participants of a round.
    pub shared_seed: Option<u64>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self::fixed(DEFAULT_MASKING_BOUND)
    }
}

impl MaskConfig {
    /// Creates a configuration with a constant masking bound.
    pub fn fixed(masking_bound: f64) -> Self {
        Self {
            masking_bound,
            randomize: false,
            shared_seed: None,
        }
    }

    /// Creates a configuration with a masking bound derived from a shared seed.
    pub fn randomized(ceiling: f64, shared_seed: u64) -> Self {
        Self {
            masking_bound: ceiling,
            randomize: true,
            shared_seed: Some(shared_seed),
        }
    }

    /// Selects the masking bound of this configuration.
    ///
    /// The selection is deterministic: the same configuration always yields the same bound.
    ///
    /// # Errors
    /// Fails if the configured bound is not positive or exceeds [`MAX_MASKING_BOUND`], if a
    /// randomized configuration lacks the shared seed or if its ceiling is below
    /// [`MIN_RANDOMIZED_BOUND`].
    pub fn masking_bound(&self) -> Result<MaskingBound, ProtocolError> {
        let ceiling = MaskingBound::new(self.masking_bound)?;
        if !self.randomize {
            return Ok(ceiling);
        }

        let seed = self.shared_seed.ok_or(ProtocolError::MissingSharedSeed)?;
        if ceiling.get() < MIN_RANDOMIZED_BOUND {
            return Err(ProtocolError::InvalidMaskingBound(ceiling.get()));
        }
        MaskingBound::new(derive_shared_value(
            seed,
            MIN_RANDOMIZED_BOUND,
            ceiling.get(),
        ))
    }
}
