//! Collection of received shares and reconstruction of obfuscated vectors.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    common::{round_to_precision, ProtocolParameters},
    mask::share::{add_assign, MaskShare, ObfuscatedVector, RetainedShare},
    ParticipantId,
    ProtocolError,
};

#[derive(Debug, Clone, Default, PartialEq)]
/// The masking shares a participant received, keyed by sender.
pub struct ReceivedShareSet {
    shares: BTreeMap<ParticipantId, MaskShare>,
}

impl ReceivedShareSet {
    /// Creates an empty share set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the share received from `sender`.
    ///
    /// # Errors
    /// Fails if a share from the same sender was already received. The set is left unchanged.
    pub fn insert(&mut self, sender: ParticipantId, share: MaskShare) -> Result<(), ProtocolError> {
        if self.shares.contains_key(&sender) {
            return Err(ProtocolError::DuplicateShare(sender));
        }
        self.shares.insert(sender, share);
        Ok(())
    }

    /// Gets the number of received shares.
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// Checks whether no share was received yet.
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Checks whether a share from `sender` was received.
    pub fn contains(&self, sender: ParticipantId) -> bool {
        self.shares.contains_key(&sender)
    }

    /// Iterates over the senders in ascending order.
    pub fn senders(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.shares.keys().copied()
    }

    /// Iterates over the received shares in ascending sender order.
    pub fn shares(&self) -> impl Iterator<Item = &MaskShare> {
        self.shares.values()
    }

    /// Checks whether the set holds exactly one share from every one of the `peers`.
    pub fn is_complete(&self, peers: &BTreeSet<ParticipantId>) -> bool {
        self.shares.len() == peers.len() && self.senders().all(|sender| peers.contains(&sender))
    }

    /// Removes every share.
    pub fn clear(&mut self) {
        self.shares.clear();
    }
}

/// A reconstructor of the obfuscated vector of one participant.
#[derive(Debug, Clone)]
pub struct Reconstructor {
    peers: BTreeSet<ParticipantId>,
    dimensionality: usize,
}

impl Reconstructor {
    /// Creates a reconstructor for the participant `owner` of the round described by `params`.
    ///
    /// # Errors
    /// Fails if the owner does not take part in the round.
    pub fn new(owner: ParticipantId, params: &ProtocolParameters) -> Result<Self, ProtocolError> {
        if !params.contains(owner) {
            return Err(ProtocolError::UnknownParticipant(owner));
        }
        Ok(Self {
            peers: params.peers_of(owner).collect(),
            dimensionality: params.dimensionality(),
        })
    }

    /// Gets the peers whose shares are required.
    pub fn peers(&self) -> &BTreeSet<ParticipantId> {
        &self.peers
    }

    /// Reconstructs the obfuscated vector from the `retained` share and the `received` shares.
    ///
    /// The result is the coordinate-wise sum of the retained share and every received share,
    /// rounded to the protocol precision. Summed over all participants of a round, the obfuscated
    /// vectors equal the sum of their feature vectors up to the accumulated rounding error, which
    /// is bounded by `N * K * 0.5e-4`.
    ///
    /// # Errors
    /// Fails if the received shares are not exactly one share per peer, or if any share has the
    /// wrong dimensionality.
    pub fn reconstruct(
        &self,
        retained: &RetainedShare,
        received: &ReceivedShareSet,
    ) -> Result<ObfuscatedVector, ProtocolError> {
        if !received.is_complete(&self.peers) {
            return Err(ProtocolError::IncompleteShareSet {
                expected: self.peers.len(),
                received: received.senders().filter(|s| self.peers.contains(s)).count(),
            });
        }

        self.check_dimensionality(retained.len())?;
        let mut sum = retained.as_slice().to_vec();
        for share in received.shares() {
            self.check_dimensionality(share.len())?;
            add_assign(&mut sum, share.as_slice());
        }

        Ok(sum
            .into_iter()
            .map(round_to_precision)
            .collect::<Vec<_>>()
            .into())
    }

    fn check_dimensionality(&self, actual: usize) -> Result<(), ProtocolError> {
        if actual == self.dimensionality {
            Ok(())
        } else {
            Err(ProtocolError::DimensionMismatch {
                expected: self.dimensionality,
                actual,
            })
        }
    }
}
