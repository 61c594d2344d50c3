/*!
Defines how the documents matching a search query should be processed.

A [`Collector`] is driven by [`Searcher::search`](crate::Searcher::search):
segments are visited one after the other, and within a segment matching docs
are pushed in ascending doc id order. Each step returns a
[`CollectionSignal`] that lets the collector cut the scan short.
*/

use crate::{DocId, Score, SegmentReader};

/// Returned by a collector to steer the scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionSignal {
    /// Keep pushing docs.
    Continue,
    /// No doc of the current segment can change the result anymore.
    /// The scan resumes with the next segment.
    TerminateSegment,
    /// No doc of any remaining segment can change the result.
    TerminateScan,
}

/// Collectors are in charge of collecting and retaining relevant
/// information from the document found and scored by the query.
///
/// A collector instance is stateful and is driven by a single thread, from
/// the first segment to the last one. Once every segment has been visited,
/// `harvest` turns it into its result.
pub trait Collector {
    /// Result of the collection.
    type Fruit;

    /// Returns true iff the collector requires to compute scores for documents.
    fn requires_scoring(&self) -> bool;

    /// Called before any document of `segment` is collected.
    ///
    /// `Continue` asks the searcher to iterate over the segment. A collector
    /// that processed the segment on its own returns `TerminateSegment`.
    fn begin_segment(&mut self, segment: &SegmentReader) -> crate::Result<CollectionSignal>;

    /// First doc of the current segment worth collecting.
    ///
    /// Queried after `begin_segment` returned `Continue`. Docs before it are
    /// skipped by the searcher.
    fn start_doc(&self) -> DocId {
        0
    }

    /// The query pushes the scored document to the collector via this method.
    fn collect(&mut self, doc: DocId, score: Score) -> crate::Result<CollectionSignal>;

    /// Called once all segments have been visited, or the scan was terminated.
    fn harvest(self) -> crate::Result<Self::Fruit>;
}
