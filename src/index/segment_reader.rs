use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::column::DynamicColumn;
use crate::postings::InvertedIndex;
use crate::schema::{Field, Schema};
use crate::{AggregationError, DocId, SegmentOrdinal};

/// Entry point to access all of the datastructures of a segment.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct SegmentReader {
    inner: Arc<InnerSegmentReader>,
}

struct InnerSegmentReader {
    segment_ord: SegmentOrdinal,
    max_doc: DocId,
    schema: Schema,
    columns: FxHashMap<Field, DynamicColumn>,
    inverted_indexes: FxHashMap<Field, InvertedIndex>,
}

impl SegmentReader {
    pub(crate) fn new(
        segment_ord: SegmentOrdinal,
        max_doc: DocId,
        schema: Schema,
        columns: FxHashMap<Field, DynamicColumn>,
        inverted_indexes: FxHashMap<Field, InvertedIndex>,
    ) -> SegmentReader {
        SegmentReader {
            inner: Arc::new(InnerSegmentReader {
                segment_ord,
                max_doc,
                schema,
                columns,
                inverted_indexes,
            }),
        }
    }

    /// Ordinal of the segment within its searcher.
    pub fn segment_ord(&self) -> SegmentOrdinal {
        self.inner.segment_ord
    }

    /// Returns the highest document id ever attributed in
    /// this segment + 1.
    pub fn max_doc(&self) -> DocId {
        self.inner.max_doc
    }

    /// Returns the schema of the index this segment belongs to.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Returns the column of a fast field.
    pub fn column(&self, field: Field) -> crate::Result<&DynamicColumn> {
        self.inner.columns.get(&field).ok_or_else(|| {
            AggregationError::SchemaError(format!(
                "Field '{}' is not a fast field",
                self.inner.schema.get_field_name(field)
            ))
        })
    }

    /// Returns the postings of an indexed field.
    ///
    /// Only str, bytes, i64 and date fields have postings.
    pub fn inverted_index(&self, field: Field) -> Option<&InvertedIndex> {
        self.inner.inverted_indexes.get(&field)
    }
}

impl fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentReader")
            .field("segment_ord", &self.inner.segment_ord)
            .field("max_doc", &self.inner.max_doc)
            .finish()
    }
}
