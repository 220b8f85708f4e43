//! Aggregation of obfuscated vectors.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
    common::round_to_precision,
    mask::share::{add_assign, ObfuscatedVector},
    ParticipantId,
};

#[derive(Debug, Error, Eq, PartialEq)]
/// Errors related to the aggregation of obfuscated vectors.
pub enum AggregationError {
    #[error("the obfuscated vector has {actual} coordinates instead of {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("participant {0} already contributed to the aggregation")]
    DuplicateContribution(ParticipantId),

    #[error("there is no contribution to aggregate")]
    NoContribution,
}

#[derive(Debug, Clone)]
/// An aggregator for the obfuscated vectors of a round.
///
/// The masks only cancel out once the obfuscated vector of every participant of a round has been
/// aggregated, therefore the aggregate of a partial round is meaningless.
pub struct Aggregation {
    dimensionality: usize,
    contributors: BTreeSet<ParticipantId>,
    sum: Vec<f64>,
}

#[allow(clippy::len_without_is_empty)]
impl Aggregation {
    /// Creates a new, empty aggregator for vectors of the given dimensionality.
    pub fn new(dimensionality: usize) -> Self {
        Self {
            dimensionality,
            contributors: BTreeSet::new(),
            sum: vec![0_f64; dimensionality],
        }
    }

    /// Gets the dimensionality of the aggregated vectors.
    pub fn len(&self) -> usize {
        self.dimensionality
    }

    /// Gets the participants which contributed so far.
    pub fn contributors(&self) -> &BTreeSet<ParticipantId> {
        &self.contributors
    }

    /// Validates if the obfuscated `vector` of `participant` may be aggregated.
    ///
    /// This should be checked before calling [`aggregate()`].
    ///
    /// # Errors
    /// Fails if the participant already contributed or if the dimensionalities don't coincide.
    ///
    /// [`aggregate()`]: Aggregation::aggregate
    pub fn validate_aggregation(
        &self,
        participant: ParticipantId,
        vector: &ObfuscatedVector,
    ) -> Result<(), AggregationError> {
        if self.contributors.contains(&participant) {
            return Err(AggregationError::DuplicateContribution(participant));
        }
        if vector.len() != self.dimensionality {
            return Err(AggregationError::DimensionMismatch {
                expected: self.dimensionality,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Aggregates the obfuscated `vector` of `participant`.
    ///
    /// It should be checked that [`validate_aggregation()`] succeeds before calling this, since
    /// aggregation may return garbage values otherwise.
    ///
    /// [`validate_aggregation()`]: Aggregation::validate_aggregation
    pub fn aggregate(&mut self, participant: ParticipantId, vector: &ObfuscatedVector) {
        add_assign(&mut self.sum, vector.as_slice());
        self.contributors.insert(participant);
    }

    /// Gets the sum of the aggregated vectors, rounded to the protocol precision.
    ///
    /// # Errors
    /// Fails if nothing was aggregated yet.
    pub fn sum(&self) -> Result<Vec<f64>, AggregationError> {
        if self.contributors.is_empty() {
            return Err(AggregationError::NoContribution);
        }
        Ok(self.sum.iter().copied().map(round_to_precision).collect())
    }

    /// Gets the average of the aggregated vectors, rounded to the protocol precision.
    ///
    /// # Errors
    /// Fails if nothing was aggregated yet.
    pub fn average(&self) -> Result<Vec<f64>, AggregationError> {
        if self.contributors.is_empty() {
            return Err(AggregationError::NoContribution);
        }
        let count = self.contributors.len() as f64;
        Ok(self
            .sum
            .iter()
            .map(|sum| round_to_precision(sum / count))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate() {
        let mut aggregation = Aggregation::new(2);
        let first = ObfuscatedVector::from(vec![-40.25, 60.5]);
        let second = ObfuscatedVector::from(vec![41.25, -59.5]);

        aggregation.validate_aggregation(0, &first).unwrap();
        aggregation.aggregate(0, &first);
        aggregation.validate_aggregation(1, &second).unwrap();
        aggregation.aggregate(1, &second);

        assert_eq!(aggregation.sum().unwrap(), vec![1.0, 1.0]);
        assert_eq!(aggregation.average().unwrap(), vec![0.5, 0.5]);
        assert_eq!(aggregation.contributors().len(), 2);
    }

    #[test]
    fn test_validate_aggregation() {
        let mut aggregation = Aggregation::new(2);
        let vector = ObfuscatedVector::from(vec![1.0, 2.0]);
        aggregation.aggregate(3, &vector);

        assert_eq!(
            aggregation.validate_aggregation(3, &vector),
            Err(AggregationError::DuplicateContribution(3))
        );
        assert_eq!(
            aggregation.validate_aggregation(4, &ObfuscatedVector::from(vec![1.0])),
            Err(AggregationError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_empty() {
        let aggregation = Aggregation::new(7);
        assert_eq!(aggregation.sum(), Err(AggregationError::NoContribution));
        assert_eq!(aggregation.average(), Err(AggregationError::NoContribution));
    }
}
