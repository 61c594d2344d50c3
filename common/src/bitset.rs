use std::fmt;

use crate::ByteCount;

/// A set of values within `[0, 64)` packed in a single word.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct TinySet(u64);

impl fmt::Debug for TinySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.into_iter().collect::<Vec<u32>>().fmt(f)
    }
}

pub struct TinySetIterator(TinySet);
impl Iterator for TinySetIterator {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.pop_lowest()
    }
}

impl IntoIterator for TinySet {
    type Item = u32;
    type IntoIter = TinySetIterator;
    fn into_iter(self) -> Self::IntoIter {
        TinySetIterator(self)
    }
}

impl TinySet {
    /// Returns an empty `TinySet`.
    #[inline]
    pub fn empty() -> TinySet {
        TinySet(0u64)
    }

    /// Returns true iff the `TinySet` contains the element `el`.
    #[inline]
    pub fn contains(self, el: u32) -> bool {
        self.0 & (1u64 << u64::from(el)) != 0
    }

    /// Returns the number of elements in the TinySet.
    #[inline]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn singleton(el: u32) -> TinySet {
        TinySet(1u64 << u64::from(el))
    }

    /// Insert a new element within [0..64)
    ///
    /// returns true if the set changed
    #[inline]
    pub fn insert_mut(&mut self, el: u32) -> bool {
        let old = *self;
        self.0 |= TinySet::singleton(el).0;
        old != *self
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0u64
    }

    /// Returns the lowest element in the `TinySet`
    /// and removes it.
    #[inline]
    pub fn pop_lowest(&mut self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            let lowest = self.0.trailing_zeros();
            self.0 ^= TinySet::singleton(lowest).0;
            Some(lowest)
        }
    }
}

/// Fixed capacity set of doc ids.
///
/// Iteration always yields ids in ascending order.
#[derive(Clone)]
pub struct BitSet {
    tinysets: Box<[TinySet]>,
    len: u64,
    max_value: u32,
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

fn num_buckets(max_val: u32) -> u32 {
    max_val.div_ceil(64u32)
}

impl BitSet {
    /// Create a new `BitSet` that may contain elements
    /// within `[0, max_val)`.
    pub fn with_max_value(max_value: u32) -> BitSet {
        let num_buckets = num_buckets(max_value);
        let tinysets = vec![TinySet::empty(); num_buckets as usize].into_boxed_slice();
        BitSet {
            tinysets,
            len: 0,
            max_value,
        }
    }

    /// Bytes held by a `BitSet` created with `max_value`.
    pub fn num_bytes_for_max_value(max_value: u32) -> ByteCount {
        ByteCount::from(num_buckets(max_value) as u64 * 8)
    }

    /// Returns the number of elements in the `BitSet`.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts an element in the `BitSet`.
    ///
    /// Returns true if the element was not present yet.
    #[inline]
    pub fn insert(&mut self, el: u32) -> bool {
        debug_assert!(el < self.max_value);
        let higher = el / 64u32;
        let lower = el % 64u32;
        let inserted = self.tinysets[higher as usize].insert_mut(lower);
        self.len += u64::from(inserted);
        inserted
    }

    /// Returns true iff the elements is in the `BitSet`.
    #[inline]
    pub fn contains(&self, el: u32) -> bool {
        if el >= self.max_value {
            return false;
        }
        self.tinysets[(el / 64u32) as usize].contains(el % 64)
    }

    #[inline]
    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    /// Number of bytes used by the bitset representation.
    pub fn num_bytes(&self) -> ByteCount {
        ByteCount::from(self.tinysets.len() * 8)
    }

    /// Iterate over the elements in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.tinysets
            .iter()
            .copied()
            .enumerate()
            .flat_map(|(bucket, tinyset)| {
                let base = bucket as u32 * 64;
                tinyset.into_iter().map(move |lower| base + lower)
            })
    }
}

/// Accumulates the doc ids of one segment.
///
/// Doc ids may come in any order. A doc equal to the previously added one is
/// ignored without touching the set, and the set de-duplicates the others.
/// Iterating the built set yields ascending ids. The backing `BitSet` is only
/// allocated on the first insert.
#[derive(Debug)]
pub struct DocIdSetBuilder {
    max_doc: u32,
    last_doc: Option<u32>,
    bitset: Option<BitSet>,
}

impl DocIdSetBuilder {
    pub fn new(max_doc: u32) -> DocIdSetBuilder {
        DocIdSetBuilder {
            max_doc,
            last_doc: None,
            bitset: None,
        }
    }

    /// Bytes the builder will hold once its first doc has been added.
    pub fn num_bytes_on_first_insert(&self) -> ByteCount {
        BitSet::num_bytes_for_max_value(self.max_doc)
    }

    pub fn is_allocated(&self) -> bool {
        self.bitset.is_some()
    }

    /// Records `doc`. Returns false if it repeats the last recorded doc.
    pub fn add(&mut self, doc: u32) -> bool {
        if self.last_doc == Some(doc) {
            return false;
        }
        self.last_doc = Some(doc);
        let max_doc = self.max_doc;
        self.bitset
            .get_or_insert_with(|| BitSet::with_max_value(max_doc))
            .insert(doc)
    }

    /// Seals the builder. Returns `None` if no doc was ever added.
    pub fn build(self) -> Option<BitSet> {
        self.bitset
    }
}
