//! Loading and validation of settings.
//!
//! Values defined in the configuration file can be overridden by environment variables. An example
//! of a configuration file can be found in the `configs/` directory located in the repository root.

use std::{fmt, path::Path, time::Duration};

use config::{Config, ConfigError, Environment};
use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize,
};
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::{ProtocolParameters, PARTICIPANTS_MIN},
    feature::{Alphabet, MAX_ALPHABET_SIZE},
    mask::{MaskConfig, DEFAULT_MASKING_BOUND, MAX_MASKING_BOUND, MIN_RANDOMIZED_BOUND},
    ParticipantId,
    ProtocolError,
    RoundId,
};

#[derive(Error, Debug)]
/// An error related to loading and validation of settings.
pub enum SettingsError {
    #[error("configuration loading failed: {0}")]
    Loading(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Validate, Deserialize)]
/// The combined settings.
///
/// Each section in the configuration file corresponds to the identically named settings field.
pub struct Settings {
    #[validate]
    pub protocol: ProtocolSettings,
    #[validate]
    pub exchange: ExchangeSettings,
    pub log: LoggingSettings,
}

impl Settings {
    /// Loads and validates the settings via a configuration file.
    ///
    /// # Errors
    /// Fails when the loading of the configuration file or its validation failed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings: Settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        config.merge(config::File::from(path.as_ref()))?;
        config.merge(Environment::with_prefix("safe_agg").separator("__"))?;
        config.try_into()
    }
}

#[derive(Debug, Validate, Deserialize, Clone, Copy)]
#[validate(schema(function = "validate_protocol"))]
/// The protocol settings.
pub struct ProtocolSettings {
    /// The bound `D` of the masking interval `[-D, D]`. In randomized mode this is the ceiling of
    /// the derived bound, which is drawn from `[1, masking_bound]`. The value must be greater than
    /// `0` and at most `1e9`, in randomized mode it must be at least `1`.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [protocol]
    /// masking_bound = 100.0
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SAFE_AGG_PROTOCOL__MASKING_BOUND=100.0
    /// ```
    #[serde(default = "default_masking_bound")]
    pub masking_bound: f64,

    /// Whether the masking bound is derived from the `shared_seed`.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [protocol]
    /// randomize = true
    /// shared_seed = 42
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SAFE_AGG_PROTOCOL__RANDOMIZE=true
    /// SAFE_AGG_PROTOCOL__SHARED_SEED=42
    /// ```
    #[serde(default)]
    pub randomize: bool,

    /// The seed every participant of a round uses to derive the randomized masking bound. It is
    /// required in randomized mode and ignored otherwise.
    #[serde(default)]
    pub shared_seed: Option<u64>,

    /// The number of participants of a round. The value must be at least `2`.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [protocol]
    /// participants = 5
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SAFE_AGG_PROTOCOL__PARTICIPANTS=5
    /// ```
    pub participants: u32,

    /// The number of symbols of the response alphabet. The value must be between `1` and `20`.
    #[serde(default = "default_alphabet_size")]
    pub alphabet_size: u32,
}

fn default_masking_bound() -> f64 {
    DEFAULT_MASKING_BOUND
}

fn default_alphabet_size() -> u32 {
    Alphabet::default().len() as u32
}

impl ProtocolSettings {
    /// Checks the protocol settings.
    fn validate_protocol(&self) -> Result<(), ValidationError> {
        self.validate_masking()?;
        self.validate_counts()
    }

    /// Checks the validity of the masking configuration.
    fn validate_masking(&self) -> Result<(), ValidationError> {
        // the ceiling of a randomized bound depends on the mode, which attributes cannot express
        if !(self.masking_bound > 0. && self.masking_bound <= MAX_MASKING_BOUND) {
            return Err(ValidationError::new("invalid masking bound"));
        }
        if self.randomize
            && (self.shared_seed.is_none() || self.masking_bound < MIN_RANDOMIZED_BOUND)
        {
            return Err(ValidationError::new("invalid randomized masking bound"));
        }
        Ok(())
    }

    /// Checks the validity of the participant and alphabet sizes.
    fn validate_counts(&self) -> Result<(), ValidationError> {
        let alphabet_size = self.alphabet_size as usize;
        if PARTICIPANTS_MIN <= self.participants as usize
            && (1..=MAX_ALPHABET_SIZE).contains(&alphabet_size)
        {
            Ok(())
        } else {
            Err(ValidationError::new("invalid participant or alphabet size"))
        }
    }

    /// Gets the masking configuration.
    pub fn mask_config(&self) -> MaskConfig {
        MaskConfig {
            masking_bound: self.masking_bound,
            randomize: self.randomize,
            shared_seed: self.shared_seed,
        }
    }

    /// Gets the response alphabet.
    ///
    /// # Errors
    /// Fails if the alphabet is empty or too large.
    pub fn alphabet(&self) -> Result<Alphabet, ProtocolError> {
        Alphabet::new(self.alphabet_size as usize)
    }

    /// Gets the ids of the participants, `0` to `participants - 1`.
    pub fn participant_ids(&self) -> impl Iterator<Item = ParticipantId> {
        0..self.participants
    }

    /// Fixes the parameters of the round `round_id`.
    ///
    /// # Errors
    /// Fails if the settings do not describe valid protocol parameters.
    pub fn parameters(&self, round_id: RoundId) -> Result<ProtocolParameters, ProtocolError> {
        ProtocolParameters::configure(
            round_id,
            self.alphabet()?,
            self.participant_ids(),
            &self.mask_config(),
        )
    }
}

/// A wrapper for validate derive.
fn validate_protocol(s: &ProtocolSettings) -> Result<(), ValidationError> {
    s.validate_protocol()
}

#[derive(Debug, Validate, Deserialize, Clone, Copy)]
/// The share exchange settings.
pub struct ExchangeSettings {
    /// The time in milliseconds a participant waits for each masking share of its peers before
    /// the round is aborted. The value must be greater than `0`.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [exchange]
    /// timeout_ms = 5000
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SAFE_AGG_EXCHANGE__TIMEOUT_MS=5000
    /// ```
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
}

impl ExchangeSettings {
    /// Gets the receive timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
/// Logging settings.
pub struct LoggingSettings {
    /// A comma-separated list of logging directives. More information about logging directives
    /// can be found [here].
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [log]
    /// filter = "info"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SAFE_AGG_LOG__FILTER=info
    /// ```
    ///
    /// [here]: https://docs.rs/tracing-subscriber/0.2.15/tracing_subscriber/filter/struct.EnvFilter.html#directives
    #[serde(deserialize_with = "deserialize_env_filter")]
    pub filter: EnvFilter,
}

fn deserialize_env_filter<'de, D>(deserializer: D) -> Result<EnvFilter, D::Error>
where
    D: Deserializer<'de>,
{
    struct EnvFilterVisitor;

    impl<'de> Visitor<'de> for EnvFilterVisitor {
        type Value = EnvFilter;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a valid tracing filter directive: https://docs.rs/tracing-subscriber/0.2.15/tracing_subscriber/filter/struct.EnvFilter.html#directives")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            EnvFilter::try_new(value)
                .map_err(|_| de::Error::invalid_value(serde::de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_str(EnvFilterVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Default for ProtocolSettings {
        fn default() -> Self {
            Self {
                masking_bound: 100.,
                randomize: false,
                shared_seed: None,
                participants: 5,
                alphabet_size: 7,
            }
        }
    }

    #[test]
    fn test_settings_new() {
        assert!(Settings::new("configs/config.toml").is_ok());
        assert!(Settings::new("").is_err());
    }

    #[test]
    fn test_validate_protocol() {
        assert!(ProtocolSettings::default().validate_protocol().is_ok());
        assert!(ProtocolSettings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_masking() {
        let protocol = ProtocolSettings {
            masking_bound: 0.,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());

        let protocol = ProtocolSettings {
            masking_bound: -5.,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());

        let protocol = ProtocolSettings {
            randomize: true,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());

        let protocol = ProtocolSettings {
            randomize: true,
            shared_seed: Some(3),
            masking_bound: 0.5,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());

        let protocol = ProtocolSettings {
            randomize: true,
            shared_seed: Some(3),
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_ok());
    }

    #[test]
    fn test_validate_masking_limit() {
        let protocol = ProtocolSettings {
            masking_bound: MAX_MASKING_BOUND,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_ok());
        assert!(protocol.parameters(0).is_ok());

        let protocol = ProtocolSettings {
            masking_bound: 1e13,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());

        let protocol = ProtocolSettings {
            masking_bound: f64::MAX,
            randomize: true,
            shared_seed: Some(3),
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());
    }

    #[test]
    fn test_validate_counts() {
        let protocol = ProtocolSettings {
            participants: 1,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());

        let protocol = ProtocolSettings {
            alphabet_size: 0,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());

        let protocol = ProtocolSettings {
            alphabet_size: 20,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_ok());
        assert_eq!(protocol.alphabet().unwrap().len(), 20);

        let protocol = ProtocolSettings {
            alphabet_size: 21,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());
        assert_eq!(
            protocol.alphabet(),
            Err(ProtocolError::InvalidAlphabetSize(21))
        );
    }

    #[test]
    fn test_validate_exchange() {
        assert!(ExchangeSettings { timeout_ms: 1 }.validate().is_ok());
        assert!(ExchangeSettings { timeout_ms: 0 }.validate().is_err());
        assert_eq!(
            ExchangeSettings { timeout_ms: 250 }.timeout(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_parameters() {
        let protocol = ProtocolSettings {
            participants: 3,
            alphabet_size: 4,
            ..ProtocolSettings::default()
        };
        let params = protocol.parameters(8).unwrap();
        assert_eq!(params.round_id, 8);
        assert_eq!(params.dimensionality(), 4);
        assert_eq!(params.participants().len(), 3);
        assert_eq!(params.masking_bound.get(), 100.);
    }
}
