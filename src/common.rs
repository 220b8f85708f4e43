use std::collections::BTreeSet;

use crate::{
    feature::Alphabet,
    mask::{MaskConfig, MaskingBound},
    ParticipantId,
    ProtocolError,
    RoundId,
};

/// The number of decimal places every protocol vector is rounded to.
pub const PRECISION: i32 = 4;

/// The minimal number of participants for which sharing hides anything.
pub const PARTICIPANTS_MIN: usize = 2;

/// Rounds a value to [`PRECISION`] decimal places, half away from zero.
///
/// Rounding happens only at the protocol boundaries: feature vector creation, mask draws,
/// retained share derivation and reconstruction.
pub fn round_to_precision(value: f64) -> f64 {
    let scale = 10_f64.powi(PRECISION);
    (value * scale).round() / scale
}

/// The parameters of a single protocol round.
///
/// They are fixed before any participant generates shares and are immutable for the rest of the
/// round. Every participant of the round is handed the same parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// The round these parameters belong to.
    pub round_id: RoundId,
    /// The closed symbol alphabet of the survey responses.
    pub alphabet: Alphabet,
    /// The bound `D` of the masking interval `[-D, D]`.
    pub masking_bound: MaskingBound,
    participants: BTreeSet<ParticipantId>,
}

impl ProtocolParameters {
    /// Fixes the parameters of a round.
    ///
    /// The masking bound is taken from the masking `config`uration. In randomized mode every
    /// caller using the same shared seed derives the identical bound, so no communication is
    /// needed to agree on it. Participants deriving different bounds would still reconstruct
    /// correctly, but agreeing on the bound is a precondition of the privacy analysis.
    ///
    /// # Errors
    /// Fails if fewer than [`PARTICIPANTS_MIN`] distinct participants are given or if the masking
    /// configuration is invalid.
    pub fn configure(
        round_id: RoundId,
        alphabet: Alphabet,
        participants: impl IntoIterator<Item = ParticipantId>,
        config: &MaskConfig,
    ) -> Result<Self, ProtocolError> {
        let participants: BTreeSet<ParticipantId> = participants.into_iter().collect();
        if participants.len() < PARTICIPANTS_MIN {
            return Err(ProtocolError::InsufficientParticipants {
                needed: PARTICIPANTS_MIN,
                actual: participants.len(),
            });
        }
        let masking_bound = config.masking_bound()?;
        Ok(Self {
            round_id,
            alphabet,
            masking_bound,
            participants,
        })
    }

    /// Gets the dimensionality `K` of every vector exchanged in this round.
    pub fn dimensionality(&self) -> usize {
        self.alphabet.len()
    }

    /// Gets the number of participants `N` of this round.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Gets the ids of all participants of this round, in ascending order.
    pub fn participants(&self) -> &BTreeSet<ParticipantId> {
        &self.participants
    }

    /// Checks whether the given participant takes part in this round.
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains(&id)
    }

    /// Gets the ids of all participants except `id`.
    pub fn peers_of(&self, id: ParticipantId) -> impl Iterator<Item = ParticipantId> + '_ {
        self.participants
            .iter()
            .copied()
            .filter(move |other| *other != id)
    }
}

/// Implements the common accessors of the protocol's real-valued vector newtypes.
macro_rules! impl_vector {
    ($name:ident) => {
        impl $name {
            /// Gets the number of coordinates.
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Checks whether the vector has no coordinates.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Iterates over the coordinates.
            pub fn iter(&self) -> std::slice::Iter<'_, f64> {
                self.0.iter()
            }

            /// Gets the coordinates as a slice.
            pub fn as_slice(&self) -> &[f64] {
                self.0.as_slice()
            }
        }
    };
}
