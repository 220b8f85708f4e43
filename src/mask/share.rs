//! The vectors a feature vector is split into and reassembled from.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use derive_more::{From, Index, Into};

#[derive(Debug, Clone, PartialEq, From, Index, Into, Serialize, Deserialize)]
/// A masking share drawn by a sender for one recipient.
///
/// Every coordinate is drawn independently and uniformly from the masking interval and rounded to
/// the protocol precision.
pub struct MaskShare(Vec<f64>);

impl_vector!(MaskShare);

#[derive(Debug, Clone, PartialEq, From, Index, Into, Serialize, Deserialize)]
/// The share a participant keeps for itself.
///
/// It is the feature vector minus the sum of the participant's masking shares, so that the
/// retained share and all masking shares sum back to the feature vector.
pub struct RetainedShare(Vec<f64>);

impl_vector!(RetainedShare);

#[derive(Debug, Clone, PartialEq, From, Index, Into, Serialize, Deserialize)]
/// The contribution of a participant to the aggregate.
///
/// It is the retained share plus every masking share received from the peers. On its own it says
/// nothing about any feature vector, but the obfuscated vectors of all participants of a round sum
/// to the sum of their feature vectors.
pub struct ObfuscatedVector(Vec<f64>);

impl_vector!(ObfuscatedVector);

/// Adds `addend` to `sum` coordinate-wise.
pub(crate) fn add_assign(sum: &mut [f64], addend: &[f64]) {
    for (s, a) in sum.iter_mut().zip(addend) {
        *s += a;
    }
}
