use std::path::PathBuf;

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use safe_agg::{
    round::Round,
    settings::Settings,
    Alphabet,
    FeatureVectorBuilder,
    Participant,
    Symbol,
};

#[derive(Debug, StructOpt)]
#[structopt(name = "simulate")]
/// Simulates one round of the sharing protocol with survey responses drawn at random.
struct Opt {
    /// Path of the configuration file
    #[structopt(short, parse(from_os_str))]
    config_path: PathBuf,

    /// Number of survey responses per participant
    #[structopt(long, default_value = "20")]
    responses: usize,

    /// Seed for the survey responses and the masking shares, drawn from entropy if absent
    #[structopt(long)]
    seed: Option<u64>,

    /// Id of the simulated round
    #[structopt(long, default_value = "0")]
    round_id: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let Settings {
        protocol,
        exchange,
        log,
    } = Settings::new(&opt.config_path)
        .with_context(|| format!("failed to load {}", opt.config_path.display()))?;

    let _fmt_subscriber = FmtSubscriber::builder()
        .with_env_filter(log.filter)
        .with_ansi(true)
        .init();

    let params = protocol
        .parameters(opt.round_id)
        .context("invalid protocol settings")?;
    let alphabet = params.alphabet;
    info!(
        round_id = params.round_id,
        participants = params.participant_count(),
        masking_bound = %params.masking_bound,
        "simulating round"
    );

    let mut prng = match opt.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };
    let participants: Vec<Participant> = protocol
        .participant_ids()
        .map(|id| {
            let responses = draw_responses(&mut prng, alphabet, opt.responses);
            let participant = Participant::new(id, alphabet, responses);
            match opt.seed {
                Some(_) => participant.with_seed(prng.gen()),
                None => participant,
            }
        })
        .collect();

    let mut expected = vec![0_f64; alphabet.len()];
    let builder = FeatureVectorBuilder::new(alphabet);
    for participant in participants.iter() {
        let vector = builder.build(participant.responses())?;
        for (sum, entry) in expected.iter_mut().zip(vector.iter()) {
            *sum += entry;
        }
    }

    let outcome = Round::new(params, exchange.timeout())
        .run(participants)
        .await?;
    let aggregation = outcome.aggregate()?;
    let aggregate = aggregation.sum()?;
    let deviation = aggregate
        .iter()
        .zip(expected.iter())
        .map(|(a, e)| (a - e).abs())
        .fold(0_f64, f64::max);

    info!("sum of feature vectors: {:?}", expected);
    info!("aggregated sum: {:?}", aggregate);
    info!("aggregated average: {:?}", aggregation.average()?);
    info!("maximal deviation: {:e}", deviation);
    Ok(())
}

fn draw_responses(prng: &mut ChaCha20Rng, alphabet: Alphabet, count: usize) -> Vec<Symbol> {
    (0..count.max(1))
        .map(|_| prng.gen_range(0..alphabet.len() as Symbol))
        .collect()
}
