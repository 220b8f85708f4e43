//! Splitting, reassembling and aggregating feature vectors.
//!
//! # Masking configurations
//! Masking shares are drawn uniformly from the interval `[-D, D]`, where `D` is the
//! [`MaskingBound`] of the round. The bound is selected from a [`MaskConfig`], either as a
//! constant or derived from a seed shared by all participants. A larger bound hides a feature
//! vector better from colluding peers, it has no effect on the correctness of the aggregate.
//!
//! # Sharing
//! A [`ShareGenerator`] draws one [`MaskShare`] per peer of its owner and derives the owner's
//! [`RetainedShare`] as the feature vector minus the sum of these shares. The masking shares and
//! the retained share therefore sum back to the feature vector.
//!
//! ```
//! # use std::collections::BTreeSet;
//! # use safe_agg::{FeatureVector, MaskingBound, ShareGenerator};
//! let participants: BTreeSet<u32> = (0..3).collect();
//! let vector = FeatureVector::from(vec![0.5, 0.5, 0.0]);
//!
//! let mut generator = ShareGenerator::new(MaskingBound::default());
//! generator.generate_shares(0, &participants, vector.len()).unwrap();
//! let retained = generator.derive_retained_share(&vector).unwrap();
//! assert!(generator.share_for(1).is_ok());
//! assert!(generator.share_for(0).is_err());
//! # let _ = retained;
//! ```
//!
//! # Reconstruction
//! Once a participant received exactly one masking share from every peer, the [`Reconstructor`]
//! adds them to its retained share, which yields its [`ObfuscatedVector`]. The obfuscated vectors
//! of all participants of a round are summed by an [`Aggregation`]: every masking share is added
//! once by its recipient and subtracted once through the retained share of its sender, so the
//! masks cancel out and only the sum of the feature vectors remains.
//!
//! Rounding to the protocol precision happens at the mask draws, at the retained share derivation
//! and at the reconstruction only.

pub(crate) mod aggregation;
pub(crate) mod config;
pub(crate) mod generator;
pub(crate) mod reconstruct;
pub(crate) mod share;

pub use self::{
    aggregation::{Aggregation, AggregationError},
    config::{
        MaskConfig,
        MaskingBound,
        DEFAULT_MASKING_BOUND,
        MAX_MASKING_BOUND,
        MIN_RANDOMIZED_BOUND,
    },
    generator::ShareGenerator,
    reconstruct::{ReceivedShareSet, Reconstructor},
    share::{MaskShare, ObfuscatedVector, RetainedShare},
};
