use crate::ProtocolError;

/// A response symbol.
pub type Symbol = u32;

/// The number of symbols of the default mood survey alphabet.
pub const MOOD_ALPHABET_SIZE: usize = 7;

/// The largest supported alphabet.
///
/// Every feature vector entry carries a rounding error of at most `5e-5`, so the entries of a
/// vector over at most this many symbols still sum to `1.0 ± 1e-3`.
pub const MAX_ALPHABET_SIZE: usize = 20;

/// A closed alphabet of response symbols.
///
/// The symbols of an alphabet of size `K` are the codes `0..K`, which is also their canonical
/// order. The index of a symbol in a feature vector is the symbol itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alphabet {
    size: usize,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            size: MOOD_ALPHABET_SIZE,
        }
    }
}

impl Alphabet {
    /// Creates an alphabet of `size` symbols.
    ///
    /// # Errors
    /// Fails if the alphabet would be empty or larger than [`MAX_ALPHABET_SIZE`].
    pub fn new(size: usize) -> Result<Self, ProtocolError> {
        if (1..=MAX_ALPHABET_SIZE).contains(&size) {
            Ok(Self { size })
        } else {
            Err(ProtocolError::InvalidAlphabetSize(size))
        }
    }

    /// Gets the number of symbols.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Checks whether `symbol` belongs to this alphabet.
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.index_of(symbol).is_some()
    }

    /// Gets the position of `symbol` in the canonical order.
    pub fn index_of(&self, symbol: Symbol) -> Option<usize> {
        let index = symbol as usize;
        if index < self.size {
            Some(index)
        } else {
            None
        }
    }

    /// Iterates over the symbols in canonical order.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> {
        0..self.size as Symbol
    }
}
