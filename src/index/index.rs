use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::index::segment_writer::validate_sort_by_field;
use crate::index::{IndexSettings, IndexWriter, Searcher, SegmentReader};
use crate::schema::Schema;
use crate::{AggregationError, SegmentOrdinal};

/// IndexBuilder can be used to create an index.
///
/// Use in conjunction with `SchemaBuilder`. Global index settings
/// can be configured with `IndexSettings`
///
/// # Examples
///
/// ```
/// use composite_agg::schema::*;
/// use composite_agg::{Index, IndexSettings, IndexSortByField, Order};
///
/// let mut schema_builder = Schema::builder();
/// let id_field = schema_builder.add_str_field("id", FAST | INDEXED);
/// let number_field = schema_builder.add_i64_field("number", FAST);
///
/// let schema = schema_builder.build();
/// let settings = IndexSettings {
///     sort_by_field: Some(IndexSortByField {
///         field: "number".to_string(),
///         order: Order::Asc,
///     }),
/// };
/// let index = Index::builder()
///     .schema(schema)
///     .settings(settings)
///     .create_in_ram()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct IndexBuilder {
    schema: Option<Schema>,
    index_settings: IndexSettings,
}

impl IndexBuilder {
    /// Creates a new `IndexBuilder`
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the settings
    #[must_use]
    pub fn settings(mut self, settings: IndexSettings) -> Self {
        self.index_settings = settings;
        self
    }

    /// Set the schema
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Creates a new index in RAM.
    pub fn create_in_ram(self) -> crate::Result<Index> {
        let schema = self.schema.ok_or_else(|| {
            AggregationError::InvalidArgument("no schema passed to the index builder".to_string())
        })?;
        if let Some(sort_by_field) = &self.index_settings.sort_by_field {
            validate_sort_by_field(&schema, sort_by_field)?;
        }
        Ok(Index {
            inner: Arc::new(InnerIndex {
                schema,
                settings: self.index_settings,
                segments: RwLock::new(Vec::new()),
            }),
        })
    }
}

struct InnerIndex {
    schema: Schema,
    settings: IndexSettings,
    segments: RwLock<Vec<SegmentReader>>,
}

/// Search Index. Segments live in RAM.
#[derive(Clone)]
pub struct Index {
    inner: Arc<InnerIndex>,
}

impl Index {
    /// Creates a new builder.
    pub fn builder() -> IndexBuilder {
        IndexBuilder::new()
    }

    /// Creates a new index in RAM, with default settings.
    pub fn create_in_ram(schema: Schema) -> Index {
        Index {
            inner: Arc::new(InnerIndex {
                schema,
                settings: IndexSettings::default(),
                segments: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Accessor for the index schema
    pub fn schema(&self) -> Schema {
        self.inner.schema.clone()
    }

    /// Accessor for the index settings
    pub fn settings(&self) -> &IndexSettings {
        &self.inner.settings
    }

    /// Creates a writer buffering documents until the next commit.
    pub fn writer(&self) -> IndexWriter {
        IndexWriter::new(self.clone())
    }

    /// Returns a searcher over the segments committed so far.
    pub fn searcher(&self) -> Searcher {
        let segments = self
            .inner
            .segments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Searcher::new(self.schema(), self.inner.settings.clone(), segments)
    }

    pub(crate) fn num_segments(&self) -> usize {
        self.inner
            .segments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Builds the next segment under the write lock, so that segment
    /// ordinals always match the position of the segment.
    pub(crate) fn publish_segment(
        &self,
        build_segment: impl FnOnce(SegmentOrdinal) -> crate::Result<SegmentReader>,
    ) -> crate::Result<()> {
        let mut segments = self
            .inner
            .segments
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let segment = build_segment(segments.len() as SegmentOrdinal)?;
        segments.push(segment);
        Ok(())
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("settings", &self.inner.settings)
            .field("num_segments", &self.num_segments())
            .finish()
    }
}
