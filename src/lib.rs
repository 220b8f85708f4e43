//! # SAFE aggregation: summing survey answers without revealing them
//!
//! A group of participants each answer a survey whose answers are drawn from a small closed
//! [`Alphabet`] of symbols. Every participant turns its answers into a [`FeatureVector`], the
//! relative frequency of each symbol. The protocol implemented here lets an aggregator learn the
//! sum (or average) of all feature vectors while no participant learns anything about another
//! participant's vector beyond what the aggregate reveals.
//!
//! ## Additive secret sharing
//!
//! The mechanism is additive secret sharing over real-valued vectors. For a round with `N`
//! participants, each participant:
//!
//! 1. builds its feature vector from its answers,
//! 2. draws `N - 1` masking shares, one per peer, with every coordinate uniform on `[-D, D]`,
//! 3. derives its retained share as the feature vector minus the sum of its masking shares, so
//!    that all `N` shares sum back to the feature vector,
//! 4. sends each masking share to its addressee and collects the `N - 1` shares addressed to it,
//! 5. reconstructs its obfuscated vector as its retained share plus every received share.
//!
//! An obfuscated vector is individually meaningless, but summing the obfuscated vectors of all
//! participants cancels every mask and yields the sum of the feature vectors.
//!
//! ```
//! # use std::sync::Arc;
//! # use safe_agg::{Alphabet, MaskConfig, Participant, ProtocolParameters};
//! let alphabet = Alphabet::default();
//! let params = Arc::new(
//!     ProtocolParameters::configure(0, alphabet, vec![0, 1], &MaskConfig::default()).unwrap(),
//! );
//!
//! let mut alice = Participant::new(0, alphabet, vec![0, 0, 1, 2]);
//! let mut bob = Participant::new(1, alphabet, vec![1, 1, 1, 3]);
//! for participant in [&mut alice, &mut bob].iter_mut() {
//!     participant.configure(params.clone()).unwrap();
//!     participant.build_vector().unwrap();
//!     participant.generate_shares().unwrap();
//!     participant.derive_retained_share().unwrap();
//! }
//!
//! let to_bob = alice.share_for(1).unwrap().clone();
//! let to_alice = bob.share_for(0).unwrap().clone();
//! alice.receive_share(1, to_alice).unwrap();
//! bob.receive_share(0, to_bob).unwrap();
//!
//! let total: Vec<f64> = alice
//!     .reconstruct()
//!     .unwrap()
//!     .iter()
//!     .zip(bob.reconstruct().unwrap().iter())
//!     .map(|(a, b)| a + b)
//!     .collect();
//! let expected = [0.5, 1.0, 0.25, 0.25, 0.0, 0.0, 0.0];
//! assert!(total.iter().zip(expected.iter()).all(|(t, e)| (t - e).abs() < 1e-3));
//! ```
//!
//! ## Running rounds
//!
//! A [`Participant`] is a plain state machine and can be driven single-threaded. The
//! [`round::Round`] driver instead runs every participant as its own task, connects them through
//! a [`ShareExchange`] and aborts the whole round as soon as any participant fails, so that no
//! partial round ever reaches an aggregate.
//!
//! The honest-but-curious adversary model is assumed throughout: participants follow the protocol
//! but may try to learn from the messages they observe.

#[macro_use]
extern crate serde;

#[macro_use]
pub mod common;
pub mod crypto;
pub mod exchange;
pub mod feature;
pub mod mask;
pub mod participant;
pub mod round;
pub mod settings;

use thiserror::Error;

pub use self::{
    common::ProtocolParameters,
    exchange::{InMemoryExchange, ShareExchange, ShareMessage},
    feature::{Alphabet, FeatureVector, FeatureVectorBuilder, Symbol},
    mask::{
        Aggregation,
        MaskConfig,
        MaskShare,
        MaskingBound,
        ObfuscatedVector,
        ReceivedShareSet,
        Reconstructor,
        RetainedShare,
        ShareGenerator,
    },
    participant::{Participant, ParticipantPhase},
};

/// The identifier of a participant, unique within a round.
pub type ParticipantId = u32;

/// The identifier of a protocol round.
pub type RoundId = u64;

#[derive(Debug, Error, PartialEq)]
/// Errors raised by the local computations of the protocol.
///
/// None of these are retried: a round in which any of them occurs fails as a whole.
pub enum ProtocolError {
    #[error("cannot build a feature vector from an empty response sequence")]
    EmptyInput,

    #[error("invalid alphabet size {0}: an alphabet holds between 1 and 20 symbols")]
    InvalidAlphabetSize(usize),

    #[error("response symbol {0} is not part of the alphabet")]
    InvalidSymbol(Symbol),

    #[error("participant {0} is not a recipient in this round")]
    UnknownRecipient(ParticipantId),

    #[error("participant {0} is not part of this round")]
    UnknownParticipant(ParticipantId),

    #[error("incomplete share set: expected {expected} peer shares, received {received}")]
    IncompleteShareSet { expected: usize, received: usize },

    #[error("a share from participant {0} was already received")]
    DuplicateShare(ParticipantId),

    #[error("`{operation}` cannot be performed in the {phase} phase")]
    OutOfSequence {
        operation: &'static str,
        phase: ParticipantPhase,
    },

    #[error("no protocol parameters are configured for the current round")]
    ParameterNotSet,

    #[error("no masking shares have been generated")]
    SharesNotGenerated,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid masking bound: {0}")]
    InvalidMaskingBound(f64),

    #[error("a randomized masking bound requires a shared seed")]
    MissingSharedSeed,

    #[error("insufficient participants: need at least {needed}, got {actual}")]
    InsufficientParticipants { needed: usize, actual: usize },
}
