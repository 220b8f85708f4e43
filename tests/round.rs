use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing_subscriber::{filter::EnvFilter, FmtSubscriber};

use safe_agg::{
    exchange::{InMemoryEndpoint, InMemoryExchangeError},
    round::{ParticipantFailure, Round, RoundError, RoundOutcome},
    settings::Settings,
    Alphabet,
    FeatureVectorBuilder,
    InMemoryExchange,
    MaskConfig,
    MaskShare,
    MaskingBound,
    Participant,
    ParticipantId,
    ProtocolParameters,
    ShareExchange,
    Symbol,
};

/// Toggles logging in the tests. If the `TEST_LOGS` environment variable is set, its value is
/// used as a filter for tracing:
///
/// ```no_rust
/// TEST_LOGS=debug cargo test
/// ```
fn enable_logging() {
    if let Ok(filter) = ::std::env::var("TEST_LOGS") {
        let _ = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::new(filter))
            .try_init();
    }
}

/// An exchange endpoint which silently drops the shares addressed to one participant.
struct DroppingEndpoint {
    inner: InMemoryEndpoint,
    drop_for: Option<ParticipantId>,
}

#[async_trait]
impl ShareExchange for DroppingEndpoint {
    type Error = InMemoryExchangeError;

    async fn send(
        &mut self,
        sender: ParticipantId,
        recipient: ParticipantId,
        share: MaskShare,
    ) -> Result<(), Self::Error> {
        if self.drop_for == Some(recipient) {
            return Ok(());
        }
        self.inner.send(sender, recipient, share).await
    }

    async fn receive(&mut self) -> Result<(ParticipantId, MaskShare), Self::Error> {
        self.inner.receive().await
    }
}

fn params(n: u32, config: &MaskConfig) -> ProtocolParameters {
    ProtocolParameters::configure(1, Alphabet::default(), 0..n, config).unwrap()
}

fn random_responses(prng: &mut ChaCha20Rng) -> Vec<Symbol> {
    let len = prng.gen_range(1..40);
    (0..len).map(|_| prng.gen_range(0..7)).collect()
}

fn feature_sum(participants: &[Participant]) -> Vec<f64> {
    let builder = FeatureVectorBuilder::new(Alphabet::default());
    let mut sum = vec![0_f64; 7];
    for participant in participants {
        let vector = builder.build(participant.responses()).unwrap();
        for (total, entry) in sum.iter_mut().zip(vector.iter()) {
            *total += entry;
        }
    }
    sum
}

fn aggregate(outcome: &RoundOutcome) -> Vec<f64> {
    outcome.aggregate().unwrap().sum().unwrap()
}

fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!(
            (a - e).abs() <= tolerance,
            "{:?} differs from {:?} by more than {}",
            actual,
            expected,
            tolerance
        );
    }
}

#[tokio::test]
async fn test_two_participants() {
    enable_logging();
    let participants = vec![
        Participant::new(0, Alphabet::default(), vec![0, 0, 1, 2]),
        Participant::new(1, Alphabet::default(), vec![1, 1, 1, 3]),
    ];
    let round = Round::new(
        params(2, &MaskConfig::fixed(100.0)),
        Duration::from_secs(1),
    );

    let outcome = round.run(participants).await.unwrap();
    assert_eq!(outcome.obfuscated.len(), 2);
    assert_close(
        &aggregate(&outcome),
        &[0.5, 1.0, 0.25, 0.25, 0.0, 0.0, 0.0],
        2.0 * 7.0 * 5e-5,
    );
    // an obfuscated vector on its own does not resemble a feature vector
    assert!(outcome.obfuscated[&0].iter().any(|c| !(0.0..=1.0).contains(c)));
}

#[tokio::test]
async fn test_random_rounds() {
    enable_logging();
    let mut prng = ChaCha20Rng::from_seed([7_u8; 32]);
    for n in 2..=8 {
        let participants: Vec<Participant> = (0..n)
            .map(|id| Participant::new(id, Alphabet::default(), random_responses(&mut prng)))
            .collect();
        let expected = feature_sum(&participants);
        let round = Round::new(params(n, &MaskConfig::default()), Duration::from_secs(1));

        let outcome = round.run(participants).await.unwrap();
        assert_close(&aggregate(&outcome), &expected, n as f64 * 7.0 * 5e-5);
    }
}

#[tokio::test]
async fn test_randomness_does_not_change_aggregate() {
    let responses: Vec<Vec<Symbol>> = vec![vec![0, 4, 4], vec![2, 2, 6, 1], vec![5], vec![3, 3]];
    let participants = |seed: u8| -> Vec<Participant> {
        responses
            .iter()
            .enumerate()
            .map(|(id, responses)| {
                Participant::new(id as ParticipantId, Alphabet::default(), responses.clone())
                    .with_seed([seed + id as u8; 32])
            })
            .collect()
    };
    let expected = feature_sum(&participants(0));
    let round = Round::new(params(4, &MaskConfig::default()), Duration::from_secs(1));

    let first = round.run(participants(10)).await.unwrap();
    let second = round.run(participants(20)).await.unwrap();
    assert_ne!(first.obfuscated, second.obfuscated);
    assert_close(&aggregate(&first), &expected, 4.0 * 7.0 * 5e-5);
    assert_close(&aggregate(&second), &expected, 4.0 * 7.0 * 5e-5);
}

#[tokio::test]
async fn test_missing_share_aborts_round() {
    enable_logging();
    let params = params(3, &MaskConfig::default());
    let endpoints: BTreeMap<ParticipantId, DroppingEndpoint> =
        InMemoryExchange::new(params.round_id, 0..3)
            .into_endpoints()
            .into_iter()
            .map(|(id, inner)| {
                let drop_for = if id == 0 { Some(1) } else { None };
                (id, DroppingEndpoint { inner, drop_for })
            })
            .collect();
    let participants = (0..3)
        .map(|id| Participant::new(id, Alphabet::default(), vec![id, id + 1]))
        .collect();
    let round = Round::new(params, Duration::from_millis(200));

    assert_eq!(
        round.run_with(participants, endpoints).await,
        Err(RoundError::Aborted {
            round_id: 1,
            participant: 1,
            reason: ParticipantFailure::Timeout {
                received: 1,
                expected: 2
            },
        })
    );
}

#[tokio::test]
async fn test_randomized_masking_bound() {
    let config = MaskConfig::randomized(50.0, 9);
    let params = params(3, &config);
    let bound = params.masking_bound.get();
    assert!((1.0..=50.0).contains(&bound));
    assert_eq!(params.masking_bound, config.masking_bound().unwrap());

    let mut participant = Participant::new(0, Alphabet::default(), vec![1, 2]);
    participant.configure(Arc::new(params.clone())).unwrap();
    participant.build_vector().unwrap();
    participant.generate_shares().unwrap();
    for (_, share) in participant.outgoing_shares().unwrap() {
        assert!(share.iter().all(|c| c.abs() <= bound + 5e-5));
    }

    let participants = (0..3)
        .map(|id| Participant::new(id, Alphabet::default(), vec![id]))
        .collect();
    let outcome = Round::new(params, Duration::from_secs(1))
        .run(participants)
        .await
        .unwrap();
    assert_close(
        &aggregate(&outcome),
        &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        3.0 * 7.0 * 5e-5,
    );
}

#[tokio::test]
async fn test_largest_masking_bound() {
    assert!(MaskingBound::new(f64::MAX).is_err());
    assert!(MaskConfig::fixed(1e13).masking_bound().is_err());

    let mut prng = ChaCha20Rng::from_seed([11_u8; 32]);
    let participants: Vec<Participant> = (0..5)
        .map(|id| Participant::new(id, Alphabet::default(), random_responses(&mut prng)))
        .collect();
    let expected = feature_sum(&participants);
    let config = MaskConfig::fixed(safe_agg::mask::MAX_MASKING_BOUND);
    let round = Round::new(params(5, &config), Duration::from_secs(1));

    let outcome = round.run(participants).await.unwrap();
    assert_close(&aggregate(&outcome), &expected, 5.0 * 7.0 * 5e-5);
}

#[tokio::test]
async fn test_round_from_settings() {
    let settings = Settings::new("configs/config.toml").unwrap();
    let params = settings.protocol.parameters(3).unwrap();
    let n = params.participant_count() as u32;
    let participants = (0..n)
        .map(|id| Participant::new(id, params.alphabet, vec![id % 7]))
        .collect();

    let outcome = Round::new(params, settings.exchange.timeout())
        .run(participants)
        .await
        .unwrap();
    assert_eq!(outcome.round_id, 3);
    assert_eq!(outcome.obfuscated.len(), n as usize);
}
