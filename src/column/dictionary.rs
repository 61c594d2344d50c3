use std::sync::Arc;

/// Sorted set of unique terms. The position of a term is its ordinal.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    terms: Arc<[Vec<u8>]>,
}

impl Dictionary {
    /// Builds a dictionary from sorted, deduplicated terms.
    pub(crate) fn from_sorted_terms(terms: Vec<Vec<u8>>) -> Dictionary {
        debug_assert!(terms.windows(2).all(|w| w[0] < w[1]));
        Dictionary {
            terms: Arc::from(terms),
        }
    }

    /// Returns the number of terms in the dictionary.
    pub fn num_terms(&self) -> u64 {
        self.terms.len() as u64
    }

    /// Returns the term associated with a given term ordinal.
    pub fn ord_to_term(&self, term_ord: u64) -> Option<&[u8]> {
        self.terms.get(term_ord as usize).map(Vec::as_slice)
    }

    /// Returns the ordinal of the term.
    ///
    /// If the term is absent, returns the ordinal it would have if it were
    /// inserted, in `Err`.
    pub fn term_ord(&self, term: &[u8]) -> Result<u64, u64> {
        self.terms
            .binary_search_by(|probe| probe.as_slice().cmp(term))
            .map(|ord| ord as u64)
            .map_err(|ord| ord as u64)
    }

    /// Iterates over the terms in ascending order.
    pub fn terms(&self) -> impl Iterator<Item = &[u8]> {
        self.terms.iter().map(Vec::as_slice)
    }
}
