//! Provides the per-round state machine of a participant of the sharing protocol.
//!
//! A [`Participant`] owns its survey responses and all of its per-round state. It moves through
//! the phases of a round strictly in order:
//!
//! ```text
//! Idle -> VectorBuilt -> SharesGenerated -> RetainedDerived -> SharesExchanged -> Reconstructed
//! ```
//!
//! Every transition is caused by exactly one operation and operations called in the wrong phase
//! fail instead of proceeding. The state machine performs no I/O, moving the masking shares
//! between participants is left to a [`ShareExchange`].
//!
//! [`ShareExchange`]: crate::exchange::ShareExchange

use std::sync::Arc;

use derive_more::Display;
use tracing::{debug, info};

use crate::{
    common::ProtocolParameters,
    crypto::PrngSeed,
    feature::{Alphabet, FeatureVector, FeatureVectorBuilder, Symbol},
    mask::{
        MaskShare,
        ObfuscatedVector,
        ReceivedShareSet,
        Reconstructor,
        RetainedShare,
        ShareGenerator,
    },
    ParticipantId,
    ProtocolError,
};

/// The phase of a participant within a round.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ParticipantPhase {
    #[display(fmt = "Idle")]
    Idle,
    #[display(fmt = "VectorBuilt")]
    VectorBuilt,
    #[display(fmt = "SharesGenerated")]
    SharesGenerated,
    #[display(fmt = "RetainedDerived")]
    RetainedDerived,
    #[display(fmt = "SharesExchanged")]
    SharesExchanged,
    #[display(fmt = "Reconstructed")]
    Reconstructed,
}

#[derive(Debug)]
/// A participant of the sharing protocol.
pub struct Participant {
    id: ParticipantId,
    alphabet: Alphabet,
    responses: Vec<Symbol>,

    // round state
    params: Option<Arc<ProtocolParameters>>,
    phase: ParticipantPhase,
    vector: Option<FeatureVector>,
    generator: Option<ShareGenerator>,
    retained: Option<RetainedShare>,
    received: ReceivedShareSet,
    obfuscated: Option<ObfuscatedVector>,

    prng_seed: Option<PrngSeed>,
}

impl Participant {
    /// Creates an unconfigured participant holding the given survey `responses`.
    ///
    /// The participant can build its feature vector right away, but it needs to be
    /// [`configure`]d with the parameters of a round before it can generate shares.
    ///
    /// [`configure`]: Participant::configure
    pub fn new(id: ParticipantId, alphabet: Alphabet, responses: Vec<Symbol>) -> Self {
        Self {
            id,
            alphabet,
            responses,
            params: None,
            phase: ParticipantPhase::Idle,
            vector: None,
            generator: None,
            retained: None,
            received: ReceivedShareSet::new(),
            obfuscated: None,
            prng_seed: None,
        }
    }

    /// Seeds the masking share PRNG of this participant deterministically.
    ///
    /// The same seed yields the same masking shares in every round, which is only useful for
    /// reproducible tests and simulations.
    pub fn with_seed(mut self, seed: PrngSeed) -> Self {
        self.prng_seed = Some(seed);
        self
    }

    /// Gets the id of this participant.
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Gets the current phase of this participant.
    pub fn phase(&self) -> ParticipantPhase {
        self.phase
    }

    /// Gets the survey responses of this participant.
    pub fn responses(&self) -> &[Symbol] {
        &self.responses
    }

    /// Gets the parameters of the current round, if configured.
    pub fn params(&self) -> Option<&ProtocolParameters> {
        self.params.as_deref()
    }

    /// Gets the feature vector, once built.
    pub fn feature_vector(&self) -> Option<&FeatureVector> {
        self.vector.as_ref()
    }

    /// Gets the retained share, once derived.
    pub fn retained_share(&self) -> Option<&RetainedShare> {
        self.retained.as_ref()
    }

    /// Gets the masking shares received so far.
    pub fn received_shares(&self) -> &ReceivedShareSet {
        &self.received
    }

    /// Gets the obfuscated vector, once reconstructed.
    pub fn obfuscated_vector(&self) -> Option<&ObfuscatedVector> {
        self.obfuscated.as_ref()
    }

    /// Hands the parameters of a round to this participant.
    ///
    /// # Errors
    /// Fails if shares were already generated in this round, if the participant is not part of
    /// the round or if the round uses a different alphabet.
    pub fn configure(&mut self, params: Arc<ProtocolParameters>) -> Result<(), ProtocolError> {
        if self.phase > ParticipantPhase::VectorBuilt {
            return Err(self.out_of_sequence("configure"));
        }
        if !params.contains(self.id) {
            return Err(ProtocolError::UnknownParticipant(self.id));
        }
        if params.alphabet != self.alphabet {
            return Err(ProtocolError::DimensionMismatch {
                expected: params.dimensionality(),
                actual: self.alphabet.len(),
            });
        }
        debug!(id = self.id, round_id = params.round_id, "configured participant");
        self.params = Some(params);
        Ok(())
    }

    /// Builds the feature vector from the survey responses.
    ///
    /// # Errors
    /// Fails if called outside of the `Idle` phase or if the responses are empty or invalid.
    pub fn build_vector(&mut self) -> Result<&FeatureVector, ProtocolError> {
        self.expect_phase("build_vector", ParticipantPhase::Idle)?;
        let vector = FeatureVectorBuilder::new(self.alphabet).build(&self.responses)?;
        self.transition(ParticipantPhase::VectorBuilt);
        Ok(&*self.vector.get_or_insert(vector))
    }

    /// Draws one masking share for every peer of the round.
    ///
    /// # Errors
    /// Fails if called outside of the `VectorBuilt` phase or if no round is configured.
    pub fn generate_shares(&mut self) -> Result<(), ProtocolError> {
        self.expect_phase("generate_shares", ParticipantPhase::VectorBuilt)?;
        let params = self.params.as_ref().ok_or(ProtocolError::ParameterNotSet)?;

        let mut generator = match self.prng_seed {
            Some(seed) => ShareGenerator::with_seed(params.masking_bound, seed),
            None => ShareGenerator::new(params.masking_bound),
        };
        generator.generate_shares(self.id, params.participants(), params.dimensionality())?;
        self.generator = Some(generator);
        self.transition(ParticipantPhase::SharesGenerated);
        Ok(())
    }

    /// Derives the retained share from the feature vector and the generated masking shares.
    ///
    /// # Errors
    /// Fails if called outside of the `SharesGenerated` phase.
    pub fn derive_retained_share(&mut self) -> Result<&RetainedShare, ProtocolError> {
        self.expect_phase("derive_retained_share", ParticipantPhase::SharesGenerated)?;
        let retained = match (&self.generator, &self.vector) {
            (Some(generator), Some(vector)) => generator.derive_retained_share(vector)?,
            _ => return Err(self.out_of_sequence("derive_retained_share")),
        };
        self.transition(ParticipantPhase::RetainedDerived);
        Ok(&*self.retained.get_or_insert(retained))
    }

    /// Gets the masking share addressed to `recipient`.
    ///
    /// # Errors
    /// Fails if no shares were generated yet or if the recipient is not a peer in this round.
    pub fn share_for(&self, recipient: ParticipantId) -> Result<&MaskShare, ProtocolError> {
        self.generator
            .as_ref()
            .ok_or_else(|| self.out_of_sequence("share_for"))?
            .share_for(recipient)
    }

    /// Iterates over the peers of this round and the masking shares addressed to them.
    ///
    /// # Errors
    /// Fails if no shares were generated yet.
    pub fn outgoing_shares(
        &self,
    ) -> Result<impl Iterator<Item = (ParticipantId, &MaskShare)> + '_, ProtocolError> {
        self.generator
            .as_ref()
            .map(|generator| generator.shares())
            .ok_or_else(|| self.out_of_sequence("outgoing_shares"))
    }

    /// Accepts the masking share `sender` addressed to this participant.
    ///
    /// Shares may arrive in any order. Once a share from every peer has been accepted, the
    /// participant moves on to the `SharesExchanged` phase.
    ///
    /// # Errors
    /// Fails if called outside of the `RetainedDerived` phase, if the sender is not a peer in this
    /// round, if the share has the wrong dimensionality or if the sender already sent a share.
    pub fn receive_share(
        &mut self,
        sender: ParticipantId,
        share: MaskShare,
    ) -> Result<(), ProtocolError> {
        self.expect_phase("receive_share", ParticipantPhase::RetainedDerived)?;
        let params = self.params.as_ref().ok_or(ProtocolError::ParameterNotSet)?;
        if sender == self.id || !params.contains(sender) {
            return Err(ProtocolError::UnknownParticipant(sender));
        }
        if share.len() != params.dimensionality() {
            return Err(ProtocolError::DimensionMismatch {
                expected: params.dimensionality(),
                actual: share.len(),
            });
        }

        self.received.insert(sender, share)?;
        debug!(id = self.id, sender, "received masking share");
        if self.received.len() == params.participant_count() - 1 {
            self.transition(ParticipantPhase::SharesExchanged);
        }
        Ok(())
    }

    /// Reconstructs the obfuscated vector from the retained share and the received shares.
    ///
    /// # Errors
    /// Fails if a share of any peer is still missing, or if the vector was already
    /// reconstructed in this round.
    pub fn reconstruct(&mut self) -> Result<ObfuscatedVector, ProtocolError> {
        if self.phase == ParticipantPhase::Reconstructed {
            return Err(self.out_of_sequence("reconstruct"));
        }
        let params = self.params.as_ref().ok_or(ProtocolError::ParameterNotSet)?;
        let retained = match (self.phase, &self.retained) {
            (ParticipantPhase::SharesExchanged, Some(retained)) => retained,
            _ => {
                return Err(ProtocolError::IncompleteShareSet {
                    expected: params.participant_count() - 1,
                    received: self.received.len(),
                })
            }
        };

        let obfuscated =
            Reconstructor::new(self.id, params)?.reconstruct(retained, &self.received)?;
        self.obfuscated = Some(obfuscated.clone());
        self.transition(ParticipantPhase::Reconstructed);
        Ok(obfuscated)
    }

    /// Discards all round state and returns to the `Idle` phase.
    ///
    /// The id and the survey responses are kept, the round parameters are not.
    pub fn reset(&mut self) {
        self.params = None;
        self.vector = None;
        self.generator = None;
        self.retained = None;
        self.received.clear();
        self.obfuscated = None;
        self.transition(ParticipantPhase::Idle);
    }

    fn expect_phase(
        &self,
        operation: &'static str,
        phase: ParticipantPhase,
    ) -> Result<(), ProtocolError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.out_of_sequence(operation))
        }
    }

    fn out_of_sequence(&self, operation: &'static str) -> ProtocolError {
        ProtocolError::OutOfSequence {
            operation,
            phase: self.phase,
        }
    }

    fn transition(&mut self, phase: ParticipantPhase) {
        info!(id = self.id, from = %self.phase, to = %phase, "participant changed phase");
        self.phase = phase;
    }
}
