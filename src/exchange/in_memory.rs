use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::{
    exchange::{ShareExchange, ShareMessage},
    mask::MaskShare,
    ParticipantId,
    RoundId,
};

#[derive(Debug, Error, PartialEq)]
/// Errors of the in-memory share exchange.
pub enum InMemoryExchangeError {
    #[error("participant {0} is not a recipient in this exchange")]
    UnknownRecipient(ParticipantId),

    #[error("endpoint of participant {owner} cannot send on behalf of participant {sender}")]
    SenderMismatch {
        owner: ParticipantId,
        sender: ParticipantId,
    },

    #[error("the channel to participant {0} is closed")]
    ChannelClosed(ParticipantId),

    #[error("received a share of round {actual} during round {expected}")]
    RoundMismatch { expected: RoundId, actual: RoundId },
}

/// An exchange of masking shares between the participants of one process.
///
/// Every participant gets an inbox. Its [`InMemoryEndpoint`] reads from that inbox and holds a
/// sender for the inbox of every participant, so an inbox stays open as long as its own endpoint
/// is alive. The inboxes are unbounded, sending never waits.
pub struct InMemoryExchange {
    round_id: RoundId,
    endpoints: BTreeMap<ParticipantId, InMemoryEndpoint>,
}

impl InMemoryExchange {
    /// Connects the given `participants` of the round `round_id`.
    pub fn new(round_id: RoundId, participants: impl IntoIterator<Item = ParticipantId>) -> Self {
        let mut senders = BTreeMap::new();
        let mut inboxes = BTreeMap::new();
        for id in participants {
            let (tx, rx) = unbounded_channel();
            senders.insert(id, tx);
            inboxes.insert(id, rx);
        }

        let endpoints = inboxes
            .into_iter()
            .map(|(owner, inbox)| {
                let endpoint = InMemoryEndpoint {
                    owner,
                    round_id,
                    inbox,
                    outboxes: senders.clone(),
                };
                (owner, endpoint)
            })
            .collect();
        Self {
            round_id,
            endpoints,
        }
    }

    /// Gets the round of this exchange.
    pub fn round_id(&self) -> RoundId {
        self.round_id
    }

    /// Takes the endpoint of participant `id` out of the exchange.
    ///
    /// Returns `None` if the participant is unknown or its endpoint was already taken.
    pub fn take_endpoint(&mut self, id: ParticipantId) -> Option<InMemoryEndpoint> {
        self.endpoints.remove(&id)
    }

    /// Takes all remaining endpoints out of the exchange.
    pub fn into_endpoints(self) -> BTreeMap<ParticipantId, InMemoryEndpoint> {
        self.endpoints
    }
}

/// The endpoint of one participant of an [`InMemoryExchange`].
#[derive(Debug)]
pub struct InMemoryEndpoint {
    owner: ParticipantId,
    round_id: RoundId,
    inbox: UnboundedReceiver<ShareMessage>,
    outboxes: BTreeMap<ParticipantId, UnboundedSender<ShareMessage>>,
}

impl InMemoryEndpoint {
    /// Gets the participant owning this endpoint.
    pub fn owner(&self) -> ParticipantId {
        self.owner
    }

    /// Forwards a complete share `message` to its recipient.
    ///
    /// The round of the message is checked by the receiving endpoint.
    ///
    /// # Errors
    /// Fails if the message was not sent by the owner of this endpoint, if the recipient is
    /// unknown or the owner itself, or if the recipient's endpoint is gone.
    pub fn deliver(&self, message: ShareMessage) -> Result<(), InMemoryExchangeError> {
        if message.sender != self.owner {
            return Err(InMemoryExchangeError::SenderMismatch {
                owner: self.owner,
                sender: message.sender,
            });
        }
        let recipient = message.recipient;
        let outbox = self
            .outboxes
            .get(&recipient)
            .filter(|_| recipient != self.owner)
            .ok_or(InMemoryExchangeError::UnknownRecipient(recipient))?;
        outbox
            .send(message)
            .map_err(|_| InMemoryExchangeError::ChannelClosed(recipient))
    }
}

#[async_trait]
impl ShareExchange for InMemoryEndpoint {
    type Error = InMemoryExchangeError;

    async fn send(
        &mut self,
        sender: ParticipantId,
        recipient: ParticipantId,
        share: MaskShare,
    ) -> Result<(), Self::Error> {
        debug!(sender, recipient, "sending masking share");
        self.deliver(ShareMessage {
            round_id: self.round_id,
            sender,
            recipient,
            share,
        })
    }

    async fn receive(&mut self) -> Result<(ParticipantId, MaskShare), Self::Error> {
        let message = self
            .inbox
            .recv()
            .await
            .ok_or(InMemoryExchangeError::ChannelClosed(self.owner))?;
        if message.round_id != self.round_id {
            return Err(InMemoryExchangeError::RoundMismatch {
                expected: self.round_id,
                actual: message.round_id,
            });
        }
        Ok((message.sender, message.share))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    fn share(value: f64) -> MaskShare {
        MaskShare::from(vec![value; 3])
    }

    #[tokio::test]
    async fn test_send_receive() {
        let mut exchange = InMemoryExchange::new(4, 0..3);
        assert_eq!(exchange.round_id(), 4);
        let mut first = exchange.take_endpoint(0).unwrap();
        let mut second = exchange.take_endpoint(1).unwrap();
        let mut third = exchange.take_endpoint(2).unwrap();
        assert!(exchange.take_endpoint(2).is_none());

        first.send(0, 2, share(1.5)).await.unwrap();
        second.send(1, 2, share(-2.5)).await.unwrap();

        assert_eq!(third.receive().await.unwrap(), (0, share(1.5)));
        assert_eq!(third.receive().await.unwrap(), (1, share(-2.5)));
    }

    #[tokio::test]
    async fn test_send_invalid() {
        let mut endpoints = InMemoryExchange::new(0, 0..2).into_endpoints();
        let endpoint = endpoints.get_mut(&0).unwrap();

        assert_eq!(
            endpoint.send(0, 5, share(0.0)).await,
            Err(InMemoryExchangeError::UnknownRecipient(5))
        );
        assert_eq!(
            endpoint.send(0, 0, share(0.0)).await,
            Err(InMemoryExchangeError::UnknownRecipient(0))
        );
        assert_eq!(
            endpoint.send(1, 0, share(0.0)).await,
            Err(InMemoryExchangeError::SenderMismatch {
                owner: 0,
                sender: 1
            })
        );
    }

    #[tokio::test]
    async fn test_send_to_dropped_endpoint() {
        let mut endpoints = InMemoryExchange::new(0, 0..2).into_endpoints();
        let mut endpoint = endpoints.remove(&0).unwrap();
        drop(endpoints);

        assert_eq!(
            endpoint.send(0, 1, share(0.0)).await,
            Err(InMemoryExchangeError::ChannelClosed(1))
        );
    }

    #[tokio::test]
    async fn test_receive_round_mismatch() {
        let mut exchange = InMemoryExchange::new(1, 0..2);
        let sender = exchange.take_endpoint(0).unwrap();
        let mut receiver = exchange.take_endpoint(1).unwrap();

        sender
            .deliver(ShareMessage {
                round_id: 9,
                sender: 0,
                recipient: 1,
                share: share(0.0),
            })
            .unwrap();
        assert_eq!(
            receiver.receive().await,
            Err(InMemoryExchangeError::RoundMismatch {
                expected: 1,
                actual: 9
            })
        );
    }

    #[tokio::test]
    async fn test_receive_waits_for_share() {
        let mut endpoints = InMemoryExchange::new(0, 0..2).into_endpoints();
        let receiver = endpoints.get_mut(&1).unwrap();
        assert!(timeout(Duration::from_millis(20), receiver.receive())
            .await
            .is_err());
    }
}
