//! Per-segment postings of indexed fields.
//!
//! For each distinct value of an indexed field, a segment keeps the ascending
//! list of docs having that value. Values are kept in ascending order, which
//! lets a consumer walk the segment value by value.

use std::sync::Arc;

use crate::DocId;
use crate::column::Dictionary;
use crate::docset::VecDocSet;

/// Sorted terms of a field, each mapped to its doc ids.
#[derive(Clone, Debug)]
pub struct Postings<K> {
    keys: Arc<[K]>,
    doc_ids: Arc<[Vec<DocId>]>,
}

impl<K: Copy + Ord> Postings<K> {
    /// `entries` must be sorted by key, with unique keys and ascending doc ids.
    pub(crate) fn from_sorted_entries(entries: Vec<(K, Vec<DocId>)>) -> Postings<K> {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        let (keys, doc_ids): (Vec<K>, Vec<Vec<DocId>>) = entries.into_iter().unzip();
        Postings {
            keys: Arc::from(keys),
            doc_ids: Arc::from(doc_ids),
        }
    }

    /// Number of distinct keys.
    pub fn num_terms(&self) -> usize {
        self.keys.len()
    }

    /// Key of the term at `term_idx`.
    pub fn key(&self, term_idx: usize) -> K {
        self.keys[term_idx]
    }

    /// Doc ids of the term at `term_idx`, in ascending order.
    pub fn doc_ids(&self, term_idx: usize) -> &[DocId] {
        &self.doc_ids[term_idx]
    }

    /// Index of the first term whose key is greater or equal to `key`.
    pub fn seek(&self, key: K) -> usize {
        self.keys.partition_point(|probe| *probe < key)
    }

    /// Returns the term index of `key`, if present.
    pub fn term_idx(&self, key: K) -> Option<usize> {
        self.keys.binary_search(&key).ok()
    }

    /// `DocSet` over the docs of the term at `term_idx`.
    pub fn docset(&self, term_idx: usize) -> VecDocSet {
        VecDocSet::from(self.doc_ids[term_idx].clone())
    }
}

/// Postings of an indexed field.
#[derive(Clone, Debug)]
pub enum InvertedIndex {
    /// Str and bytes fields, keyed by segment-local term ordinal.
    Terms {
        /// Terms of the segment. Ordinals are shared with the column.
        dictionary: Dictionary,
        /// Postings keyed by term ordinal.
        postings: Postings<u64>,
    },
    /// I64 and date fields, keyed by value.
    I64(Postings<i64>),
}
