use itertools::Itertools;

use crate::column::Dictionary;

/// Merged view over the dictionaries of all segments of a searcher.
///
/// Global ordinals preserve the byte order of terms, so comparing two global
/// ordinals is the same as comparing the terms, whatever segment they come
/// from.
#[derive(Clone, Debug, Default)]
pub struct GlobalOrdinals {
    terms: Vec<Vec<u8>>,
    /// `segment_mappings[segment_ord][local_ord]` is the global ordinal.
    segment_mappings: Vec<Vec<u64>>,
}

impl GlobalOrdinals {
    /// Merges segment dictionaries. `dictionaries[segment_ord]` is the
    /// dictionary of the segment, `None` if the segment has no column for the
    /// field.
    pub fn build(dictionaries: &[Option<&Dictionary>]) -> GlobalOrdinals {
        let mut segment_mappings: Vec<Vec<u64>> = dictionaries
            .iter()
            .map(|dict| Vec::with_capacity(dict.map(|dict| dict.num_terms()).unwrap_or(0) as usize))
            .collect();
        let mut terms: Vec<Vec<u8>> = Vec::new();
        let merged = dictionaries
            .iter()
            .enumerate()
            .filter_map(|(segment_ord, dict)| dict.map(|dict| (segment_ord, dict)))
            .map(|(segment_ord, dict)| dict.terms().map(move |term| (term, segment_ord)))
            .kmerge_by(|left, right| left.0 < right.0);
        for (term, segment_ord) in merged {
            if terms.last().map(Vec::as_slice) != Some(term) {
                terms.push(term.to_vec());
            }
            segment_mappings[segment_ord].push(terms.len() as u64 - 1);
        }
        GlobalOrdinals {
            terms,
            segment_mappings,
        }
    }

    /// Number of distinct terms across all segments.
    pub fn num_terms(&self) -> u64 {
        self.terms.len() as u64
    }

    /// Returns the term of a global ordinal.
    pub fn ord_to_term(&self, global_ord: u64) -> Option<&[u8]> {
        self.terms.get(global_ord as usize).map(Vec::as_slice)
    }

    /// Returns the global ordinal of the term, or its insertion point in `Err`.
    pub fn term_ord(&self, term: &[u8]) -> Result<u64, u64> {
        self.terms
            .binary_search_by(|probe| probe.as_slice().cmp(term))
            .map(|ord| ord as u64)
            .map_err(|ord| ord as u64)
    }

    /// Maps the local ordinals of a segment to global ordinals.
    pub fn segment_mapping(&self, segment_ord: u32) -> &[u64] {
        self.segment_mappings
            .get(segment_ord as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
