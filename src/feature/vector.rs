//! Feature vector derivation.
//!
//! See the [feature module] documentation since this is a private module anyways.
//!
//! [feature module]: crate::feature

use derive_more::{From, Index, Into};

use crate::{
    common::round_to_precision,
    feature::alphabet::{Alphabet, Symbol},
    ProtocolError,
};

#[derive(Debug, Clone, PartialEq, From, Index, Into, Serialize, Deserialize)]
/// The relative symbol frequencies of a participant's responses.
///
/// There is one entry per alphabet symbol, including the symbols which never occur, and the
/// entries sum to one up to rounding.
pub struct FeatureVector(Vec<f64>);

impl_vector!(FeatureVector);

/// Builds feature vectors over a fixed alphabet.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVectorBuilder {
    alphabet: Alphabet,
}

impl FeatureVectorBuilder {
    /// Creates a builder for the given alphabet.
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }

    /// Gets the alphabet of this builder.
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// Builds the feature vector of the given `responses`.
    ///
    /// Every entry is the count of its symbol divided by the number of responses, rounded to the
    /// protocol precision. The result does not depend on the order of the responses.
    ///
    /// # Errors
    /// Fails if there are no responses or if any response is not a symbol of the alphabet.
    pub fn build(&self, responses: &[Symbol]) -> Result<FeatureVector, ProtocolError> {
        if responses.is_empty() {
            return Err(ProtocolError::EmptyInput);
        }

        let mut counts = vec![0_usize; self.alphabet.len()];
        for symbol in responses {
            let index = self
                .alphabet
                .index_of(*symbol)
                .ok_or(ProtocolError::InvalidSymbol(*symbol))?;
            counts[index] += 1;
        }

        let total = responses.len() as f64;
        Ok(counts
            .into_iter()
            .map(|count| round_to_precision(count as f64 / total))
            .collect::<Vec<_>>()
            .into())
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::feature::MAX_ALPHABET_SIZE;

    fn builder() -> FeatureVectorBuilder {
        FeatureVectorBuilder::new(Alphabet::default())
    }

    #[test]
    fn test_build() {
        let vector = builder().build(&[0, 0, 1, 2]).unwrap();
        assert_eq!(vector.as_slice(), &[0.5, 0.25, 0.25, 0.0, 0.0, 0.0, 0.0]);

        let vector = builder().build(&[1, 1, 1, 3]).unwrap();
        assert_eq!(vector.as_slice(), &[0.0, 0.75, 0.0, 0.25, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_build_rounds_entries() {
        let vector = builder().build(&[4, 5, 5]).unwrap();
        assert_eq!(vector[4], 0.3333);
        assert_eq!(vector[5], 0.6667);
    }

    #[test]
    fn test_build_is_order_independent() {
        assert_eq!(
            builder().build(&[6, 2, 2, 0]).unwrap(),
            builder().build(&[2, 0, 6, 2]).unwrap(),
        );
    }

    #[test]
    fn test_build_empty() {
        assert_eq!(builder().build(&[]), Err(ProtocolError::EmptyInput));
    }

    #[test]
    fn test_build_invalid_symbol() {
        assert_eq!(
            builder().build(&[0, 1, 7]),
            Err(ProtocolError::InvalidSymbol(7))
        );
    }

    #[test]
    fn test_build_random_responses() {
        let mut prng = ChaCha20Rng::from_seed([1_u8; 32]);
        for _ in 0..100 {
            let len = prng.gen_range(1..50);
            let responses: Vec<Symbol> = (0..len).map(|_| prng.gen_range(0..7)).collect();
            let vector = builder().build(&responses).unwrap();
            assert_eq!(vector.len(), 7);
            assert!(vector.iter().all(|entry| *entry >= 0.0));
            assert!((vector.iter().sum::<f64>() - 1.0).abs() <= 1e-3);
        }
    }

    #[test]
    fn test_build_largest_alphabet() {
        let alphabet = Alphabet::new(MAX_ALPHABET_SIZE).unwrap();
        let builder = FeatureVectorBuilder::new(alphabet);
        for len in 1..=120 {
            let responses: Vec<Symbol> = (0..len).map(|i| i % alphabet.len() as Symbol).collect();
            let vector = builder.build(&responses).unwrap();
            assert_eq!(vector.len(), MAX_ALPHABET_SIZE);
            assert!((vector.iter().sum::<f64>() - 1.0).abs() <= 1e-3 + 1e-12);
        }
    }
}
