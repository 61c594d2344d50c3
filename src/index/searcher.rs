use std::sync::Arc;

use log::debug;

use crate::collector::{CollectionSignal, Collector};
use crate::docset::{DocSet, TERMINATED};
use crate::index::{IndexSettings, SegmentReader};
use crate::query::Query;
use crate::schema::Schema;
use crate::SegmentOrdinal;

/// Holds a list of `SegmentReader`s ready for search.
///
/// The set of segments is frozen at creation. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Searcher {
    schema: Schema,
    settings: IndexSettings,
    segment_readers: Arc<[SegmentReader]>,
}

impl Searcher {
    pub(crate) fn new(
        schema: Schema,
        settings: IndexSettings,
        segment_readers: Vec<SegmentReader>,
    ) -> Searcher {
        Searcher {
            schema,
            settings,
            segment_readers: Arc::from(segment_readers),
        }
    }

    /// Accessor for the index schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Accessor for the index settings
    pub fn index_settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Return the overall number of documents present in
    /// the index.
    pub fn num_docs(&self) -> u64 {
        self.segment_readers
            .iter()
            .map(|segment_reader| u64::from(segment_reader.max_doc()))
            .sum::<u64>()
    }

    /// Return the list of segment readers
    pub fn segment_readers(&self) -> &[SegmentReader] {
        &self.segment_readers
    }

    /// Returns the segment_reader associated with the given segment_ord
    pub fn segment_reader(&self, segment_ord: SegmentOrdinal) -> Option<&SegmentReader> {
        self.segment_readers.get(segment_ord as usize)
    }

    /// Runs a query on the segment readers wrapped by the searcher.
    ///
    /// Segments are visited in order. For each segment the collector is
    /// notified first, then the docs matching the query are pushed to it in
    /// ascending order, starting from the collector's `start_doc`. The signals
    /// returned by the collector cut the segment or the whole scan short.
    pub fn search<C: Collector>(&self, query: &dyn Query, mut collector: C) -> crate::Result<C::Fruit> {
        let weight = query.weight(self, collector.requires_scoring())?;
        'segments: for segment_reader in self.segment_readers.iter() {
            match collector.begin_segment(segment_reader)? {
                CollectionSignal::Continue => {}
                CollectionSignal::TerminateSegment => continue 'segments,
                CollectionSignal::TerminateScan => break 'segments,
            }
            let mut scorer = weight.scorer(segment_reader)?;
            let start_doc = collector.start_doc();
            let mut doc = scorer.seek(start_doc);
            while doc != TERMINATED {
                match collector.collect(doc, scorer.score())? {
                    CollectionSignal::Continue => {}
                    CollectionSignal::TerminateSegment => {
                        debug!(
                            "segment {} terminated early at doc {doc}",
                            segment_reader.segment_ord()
                        );
                        continue 'segments;
                    }
                    CollectionSignal::TerminateScan => break 'segments,
                }
                doc = scorer.advance();
            }
        }
        collector.harvest()
    }
}
