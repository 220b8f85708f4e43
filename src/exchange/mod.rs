//! Provides the contract for moving masking shares between the participants of a round.
//!
//! The sharing protocol itself performs no I/O. Each participant sends exactly one masking share
//! to every peer and receives exactly one masking share from every peer through a
//! [`ShareExchange`]. How the shares travel is up to the implementation, but it has to deliver
//! every share exactly once and unaltered.
//!
//! [`InMemoryExchange`] connects the participants of a single process through channels.

mod in_memory;

pub use self::in_memory::{InMemoryEndpoint, InMemoryExchange, InMemoryExchangeError};

use async_trait::async_trait;

use crate::{mask::MaskShare, ParticipantId, RoundId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A masking share in transit.
pub struct ShareMessage {
    /// The round the share belongs to.
    pub round_id: RoundId,
    /// The participant which drew the share.
    pub sender: ParticipantId,
    /// The participant the share is addressed to.
    pub recipient: ParticipantId,
    /// The masking share.
    pub share: MaskShare,
}

#[async_trait]
/// The endpoint of a single participant in the exchange of masking shares.
pub trait ShareExchange {
    type Error: ::std::fmt::Debug + ::std::error::Error + Send + Sync + 'static;

    /// Sends the masking `share` drawn by `sender` to `recipient`.
    async fn send(
        &mut self,
        sender: ParticipantId,
        recipient: ParticipantId,
        share: MaskShare,
    ) -> Result<(), Self::Error>;

    /// Waits for the next masking share addressed to the owner of this endpoint.
    ///
    /// Returns the sender together with the share. Waiting is unbounded, callers apply their own
    /// timeout.
    async fn receive(&mut self) -> Result<(ParticipantId, MaskShare), Self::Error>;
}
