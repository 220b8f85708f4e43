//! Feature vectors of categorical survey responses.
//!
//! Every response of a participant is a symbol of a closed [`Alphabet`] known to all participants
//! before a round starts. The [`FeatureVectorBuilder`] turns a participant's responses into a
//! [`FeatureVector`]: the relative frequency of every symbol of the alphabet, in the alphabet's
//! canonical order and rounded to the protocol precision.
//!
//! ```
//! # use safe_agg::{Alphabet, FeatureVectorBuilder};
//! let builder = FeatureVectorBuilder::new(Alphabet::default());
//! let vector = builder.build(&[0, 0, 1, 2]).unwrap();
//! assert_eq!(vector.as_slice(), &[0.5, 0.25, 0.25, 0.0, 0.0, 0.0, 0.0]);
//! ```

pub(crate) mod alphabet;
pub(crate) mod vector;

pub use self::{
    alphabet::{Alphabet, Symbol, MAX_ALPHABET_SIZE, MOOD_ALPHABET_SIZE},
    vector::{FeatureVector, FeatureVectorBuilder},
};
