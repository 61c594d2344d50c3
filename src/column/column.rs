use std::sync::Arc;

use crate::DocId;

/// Multivalued column of a segment.
///
/// Values of a doc are stored contiguously, in ascending order, without
/// duplicates.
#[derive(Clone, Debug)]
pub struct Column<T> {
    /// `start_offsets[doc]..start_offsets[doc + 1]` is the value range of `doc`.
    start_offsets: Arc<[u32]>,
    values: Arc<[T]>,
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Column {
            start_offsets: Arc::from(vec![0u32]),
            values: Arc::from(Vec::new()),
        }
    }
}

impl<T: Copy> Column<T> {
    /// Builds a column from the values of each doc.
    ///
    /// The values of each doc are expected to be sorted and deduplicated
    /// already.
    pub(crate) fn from_doc_values(doc_values: Vec<Vec<T>>) -> Column<T> {
        let mut start_offsets = Vec::with_capacity(doc_values.len() + 1);
        let mut values = Vec::new();
        start_offsets.push(0u32);
        for vals in doc_values {
            values.extend(vals);
            start_offsets.push(values.len() as u32);
        }
        Column {
            start_offsets: Arc::from(start_offsets),
            values: Arc::from(values),
        }
    }

    /// Number of docs in the column.
    pub fn num_docs(&self) -> u32 {
        (self.start_offsets.len() - 1) as u32
    }

    /// Total number of values.
    pub fn num_vals(&self) -> u32 {
        self.values.len() as u32
    }

    /// Values of `doc`, in ascending order.
    #[inline]
    pub fn values_for_doc(&self, doc: DocId) -> &[T] {
        let doc = doc as usize;
        if doc + 1 >= self.start_offsets.len() {
            return &[];
        }
        let start = self.start_offsets[doc] as usize;
        let end = self.start_offsets[doc + 1] as usize;
        &self.values[start..end]
    }

    /// Returns the first (smallest) value of `doc`, if any.
    #[inline]
    pub fn first(&self, doc: DocId) -> Option<T> {
        self.values_for_doc(doc).first().copied()
    }

    /// Returns true if no doc has more than one value.
    pub fn is_single_valued(&self) -> bool {
        self.start_offsets
            .windows(2)
            .all(|window| window[1] - window[0] <= 1)
    }
}
