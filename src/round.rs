//! Runs a complete round of the sharing protocol.
//!
//! Every participant of a round runs as its own task. A task drives its [`Participant`] through
//! the local phases, sends its masking shares through its [`ShareExchange`] endpoint and then
//! waits for the shares of its peers, with a timeout on every single receive. Waiting for shares
//! is the only point at which a task suspends.
//!
//! A round either completes for every participant or it is aborted: if any task fails, no
//! obfuscated vector of that round is handed out, so a partial round can never reach an
//! aggregate.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use futures::future::join_all;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, error_span, info, warn};
use tracing_futures::Instrument;

use crate::{
    common::ProtocolParameters,
    exchange::{InMemoryExchange, ShareExchange},
    mask::{Aggregation, AggregationError, ObfuscatedVector},
    participant::{Participant, ParticipantPhase},
    ParticipantId,
    ProtocolError,
    RoundId,
};

#[derive(Debug, Error, PartialEq)]
/// The reason a participant task failed.
pub enum ParticipantFailure {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("share exchange failed: {0}")]
    Exchange(String),

    #[error("timed out after receiving {received} of {expected} shares")]
    Timeout { received: usize, expected: usize },

    #[error("participant task panicked: {0}")]
    Panicked(String),
}

impl ParticipantFailure {
    /// Orders failures by how likely they caused a round to abort.
    ///
    /// Timeouts and exchange errors are usually the consequence of a peer failing.
    fn rank(&self) -> u8 {
        match self {
            Self::Protocol(_) => 0,
            Self::Panicked(_) => 1,
            Self::Exchange(_) => 2,
            Self::Timeout { .. } => 3,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
/// Errors of a round.
pub enum RoundError {
    #[error("round {round_id} aborted by participant {participant}: {reason}")]
    Aborted {
        round_id: RoundId,
        participant: ParticipantId,
        reason: ParticipantFailure,
    },

    #[error("participants {actual:?} do not match the round participants {expected:?}")]
    ParticipantMismatch {
        expected: Vec<ParticipantId>,
        actual: Vec<ParticipantId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// The result of a completed round.
pub struct RoundOutcome {
    /// The completed round.
    pub round_id: RoundId,
    /// The obfuscated vector of every participant of the round.
    pub obfuscated: BTreeMap<ParticipantId, ObfuscatedVector>,
    dimensionality: usize,
}

impl RoundOutcome {
    /// Aggregates the obfuscated vectors of all participants.
    ///
    /// # Errors
    /// Fails if an obfuscated vector has the wrong dimensionality.
    pub fn aggregate(&self) -> Result<Aggregation, AggregationError> {
        let mut aggregation = Aggregation::new(self.dimensionality);
        for (id, vector) in self.obfuscated.iter() {
            aggregation.validate_aggregation(*id, vector)?;
            aggregation.aggregate(*id, vector);
        }
        Ok(aggregation)
    }
}

/// A driver for one round of the sharing protocol.
#[derive(Debug, Clone)]
pub struct Round {
    params: Arc<ProtocolParameters>,
    timeout: Duration,
}

impl Round {
    /// Creates a round with the given parameters, waiting at most `timeout` for each share.
    pub fn new(params: ProtocolParameters, timeout: Duration) -> Self {
        Self {
            params: Arc::new(params),
            timeout,
        }
    }

    /// Gets the parameters of this round.
    pub fn params(&self) -> &ProtocolParameters {
        &self.params
    }

    /// Runs the round, connecting the participants through an [`InMemoryExchange`].
    ///
    /// # Errors
    /// Fails if the participants are not the ones of the round, or if the round is aborted.
    pub async fn run(&self, participants: Vec<Participant>) -> Result<RoundOutcome, RoundError> {
        let endpoints = InMemoryExchange::new(
            self.params.round_id,
            self.params.participants().iter().copied(),
        )
        .into_endpoints();
        self.run_with(participants, endpoints).await
    }

    /// Runs the round, connecting the participants through the given exchange `endpoints`.
    ///
    /// # Errors
    /// Fails if the participants or endpoints are not the ones of the round, or if the round is
    /// aborted.
    pub async fn run_with<E>(
        &self,
        participants: Vec<Participant>,
        mut endpoints: BTreeMap<ParticipantId, E>,
    ) -> Result<RoundOutcome, RoundError>
    where
        E: ShareExchange + Send + 'static,
    {
        let expected: Vec<ParticipantId> = self.params.participants().iter().copied().collect();
        let mut actual: Vec<ParticipantId> = participants.iter().map(Participant::id).collect();
        actual.sort_unstable();
        if actual != expected {
            return Err(RoundError::ParticipantMismatch { expected, actual });
        }
        let endpoint_ids: Vec<ParticipantId> = endpoints.keys().copied().collect();
        if endpoint_ids != expected {
            return Err(RoundError::ParticipantMismatch {
                expected,
                actual: endpoint_ids,
            });
        }

        let round_id = self.params.round_id;
        info!(round_id, participants = expected.len(), "starting round");
        let mut ids = Vec::with_capacity(participants.len());
        let mut tasks = Vec::with_capacity(participants.len());
        for participant in participants {
            let id = participant.id();
            // the endpoint ids were checked above
            let exchange = match endpoints.remove(&id) {
                Some(exchange) => exchange,
                None => continue,
            };
            let task = run_participant(participant, self.params.clone(), exchange, self.timeout)
                .instrument(error_span!("participant", id = id));
            ids.push(id);
            tasks.push(tokio::spawn(task));
        }

        let mut obfuscated = BTreeMap::new();
        let mut failures = Vec::new();
        for (id, result) in ids.into_iter().zip(join_all(tasks).await) {
            match result {
                Ok(Ok(vector)) => {
                    obfuscated.insert(id, vector);
                }
                Ok(Err(failure)) => failures.push((id, failure)),
                Err(join_error) => {
                    failures.push((id, ParticipantFailure::Panicked(join_error.to_string())))
                }
            }
        }

        failures.sort_by_key(|(id, failure)| (failure.rank(), *id));
        if let Some((participant, reason)) = failures.into_iter().next() {
            error!(round_id, participant, "round aborted: {}", reason);
            return Err(RoundError::Aborted {
                round_id,
                participant,
                reason,
            });
        }

        info!(round_id, "round completed");
        Ok(RoundOutcome {
            round_id,
            obfuscated,
            dimensionality: self.params.dimensionality(),
        })
    }
}

/// Runs a single participant through a round.
async fn run_participant<E>(
    mut participant: Participant,
    params: Arc<ProtocolParameters>,
    mut exchange: E,
    limit: Duration,
) -> Result<ObfuscatedVector, ParticipantFailure>
where
    E: ShareExchange,
{
    let id = participant.id();
    participant.configure(params.clone())?;
    participant.build_vector()?;
    participant.generate_shares()?;
    participant.derive_retained_share()?;

    let outgoing: Vec<_> = participant
        .outgoing_shares()?
        .map(|(recipient, share)| (recipient, share.clone()))
        .collect();
    for (recipient, share) in outgoing {
        exchange
            .send(id, recipient, share)
            .await
            .map_err(|error| exchange_failure(&error))?;
    }

    let expected = params.participant_count() - 1;
    while participant.phase() != ParticipantPhase::SharesExchanged {
        let (sender, share) = match timeout(limit, exchange.receive()).await {
            Ok(received) => received.map_err(|error| exchange_failure(&error))?,
            Err(_) => {
                let received = participant.received_shares().len();
                warn!(received, expected, "timed out waiting for masking shares");
                return Err(ParticipantFailure::Timeout { received, expected });
            }
        };
        participant.receive_share(sender, share)?;
    }

    Ok(participant.reconstruct()?)
}

fn exchange_failure(error: &impl ::std::error::Error) -> ParticipantFailure {
    warn!("share exchange failed: {}", error);
    ParticipantFailure::Exchange(error.to_string())
}
