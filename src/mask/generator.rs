//! Generation of masking shares and derivation of the retained share.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::{
    common::round_to_precision,
    crypto::{generate_coordinates, PrngSeed},
    feature::{FeatureVector, MAX_ALPHABET_SIZE},
    mask::{
        config::MaskingBound,
        share::{add_assign, MaskShare, RetainedShare},
    },
    ParticipantId,
    ProtocolError,
};

/// A generator of the masking shares of one participant.
#[derive(Debug)]
pub struct ShareGenerator {
    bound: MaskingBound,
    prng: ChaCha20Rng,
    dimensionality: usize,
    shares: BTreeMap<ParticipantId, MaskShare>,
    owner: Option<ParticipantId>,
}

impl ShareGenerator {
    /// Creates a generator drawing from the given masking `bound` with a PRNG seeded from system
    /// entropy.
    pub fn new(bound: MaskingBound) -> Self {
        Self::with_prng(bound, ChaCha20Rng::from_entropy())
    }

    /// Creates a generator drawing from the given masking `bound` with a PRNG seeded by `seed`.
    pub fn with_seed(bound: MaskingBound, seed: PrngSeed) -> Self {
        Self::with_prng(bound, ChaCha20Rng::from_seed(seed))
    }

    fn with_prng(bound: MaskingBound, prng: ChaCha20Rng) -> Self {
        Self {
            bound,
            prng,
            dimensionality: 0,
            shares: BTreeMap::new(),
            owner: None,
        }
    }

    /// Gets the masking bound of this generator.
    pub fn bound(&self) -> MaskingBound {
        self.bound
    }

    /// Draws a fresh masking share for every participant except the `owner`.
    ///
    /// Each share has `dimensionality` coordinates, drawn independently and uniformly from
    /// `[-D, D]` and rounded to the protocol precision. Shares of a previous call are discarded.
    ///
    /// # Errors
    /// Fails if the `owner` is not one of the `participants` or if `dimensionality` is not the
    /// size of a supported alphabet, in which case the nearest supported size is expected.
    pub fn generate_shares(
        &mut self,
        owner: ParticipantId,
        participants: &BTreeSet<ParticipantId>,
        dimensionality: usize,
    ) -> Result<(), ProtocolError> {
        if !participants.contains(&owner) {
            return Err(ProtocolError::UnknownParticipant(owner));
        }
        if !(1..=MAX_ALPHABET_SIZE).contains(&dimensionality) {
            return Err(ProtocolError::DimensionMismatch {
                expected: dimensionality.clamp(1, MAX_ALPHABET_SIZE),
                actual: dimensionality,
            });
        }

        let bound = self.bound.get();
        let mut shares = BTreeMap::new();
        for recipient in participants.iter().filter(|id| **id != owner) {
            debug!(owner, recipient, "drawing masking share");
            let share = generate_coordinates(&mut self.prng, bound, dimensionality);
            shares.insert(*recipient, MaskShare::from(share));
        }
        self.shares = shares;
        self.dimensionality = dimensionality;
        self.owner = Some(owner);
        Ok(())
    }

    /// Derives the retained share of the given feature `vector`.
    ///
    /// All masking shares are summed first and the sum is then subtracted from the vector, after
    /// which the result is rounded to the protocol precision.
    ///
    /// # Errors
    /// Fails if no shares have been generated yet or if the dimensionality of the vector differs
    /// from the one of the shares.
    pub fn derive_retained_share(
        &self,
        vector: &FeatureVector,
    ) -> Result<RetainedShare, ProtocolError> {
        if self.owner.is_none() {
            return Err(ProtocolError::SharesNotGenerated);
        }
        if vector.len() != self.dimensionality {
            return Err(ProtocolError::DimensionMismatch {
                expected: self.dimensionality,
                actual: vector.len(),
            });
        }

        let mut mask_sum = vec![0_f64; self.dimensionality];
        for share in self.shares.values() {
            add_assign(&mut mask_sum, share.as_slice());
        }

        Ok(vector
            .iter()
            .zip(mask_sum)
            .map(|(entry, mask)| round_to_precision(entry - mask))
            .collect::<Vec<_>>()
            .into())
    }

    /// Gets the masking share drawn for the given `recipient`.
    ///
    /// # Errors
    /// Fails if the recipient is not a peer of the owner in the current round, which includes the
    /// owner itself and the case where no shares have been generated yet.
    pub fn share_for(&self, recipient: ParticipantId) -> Result<&MaskShare, ProtocolError> {
        self.shares
            .get(&recipient)
            .ok_or(ProtocolError::UnknownRecipient(recipient))
    }

    /// Iterates over the recipients and their masking shares in ascending recipient order.
    pub fn shares(&self) -> impl Iterator<Item = (ParticipantId, &MaskShare)> {
        self.shares.iter().map(|(id, share)| (*id, share))
    }

    /// Iterates over the recipients of the generated shares in ascending order.
    pub fn recipients(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.shares.keys().copied()
    }
}
