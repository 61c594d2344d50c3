//! Nested aggregations run on the documents of the final composite buckets.

use rustc_hash::FxHashMap;

use super::agg_result::MetricResult;
use crate::{DocId, Score, SegmentReader};

/// Collector of a nested aggregation.
///
/// A composite aggregation drives its nested collectors after its buckets
/// are known. `begin` is called once, then for each replayed segment
/// `begin_segment` is followed by the `collect` calls of its documents, in
/// ascending doc id order. `end` closes the collection. Bucket ordinals are
/// the slots of the composite buckets, all lower than the `num_buckets`
/// given to `begin`.
pub trait BucketCollector {
    /// Returns true iff the collector needs the score of the documents.
    fn requires_scoring(&self) -> bool;

    /// Called once, before the first segment.
    fn begin(&mut self, num_buckets: usize) -> crate::Result<()>;

    /// Called before the documents of `segment` are collected.
    fn begin_segment(&mut self, segment: &SegmentReader) -> crate::Result<()>;

    /// Adds a document to the bucket `bucket_ord`.
    fn collect(&mut self, doc: DocId, score: Score, bucket_ord: u32) -> crate::Result<()>;

    /// Called once all segments have been collected.
    fn end(&mut self) -> crate::Result<()> {
        Ok(())
    }

    /// Result for the bucket `bucket_ord`.
    fn bucket_result(&self, bucket_ord: u32) -> crate::Result<MetricResult>;
}

/// Named collection of nested collectors, driven as one.
#[derive(Default)]
pub(crate) struct SubAggregationCollectors {
    collectors: Vec<(String, Box<dyn BucketCollector>)>,
}

impl SubAggregationCollectors {
    pub fn push(&mut self, name: String, collector: Box<dyn BucketCollector>) {
        self.collectors.push((name, collector));
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collectors.iter().any(|(other, _)| other == name)
    }

    pub fn requires_scoring(&self) -> bool {
        self.collectors
            .iter()
            .any(|(_, collector)| collector.requires_scoring())
    }

    pub fn begin(&mut self, num_buckets: usize) -> crate::Result<()> {
        for (_, collector) in &mut self.collectors {
            collector.begin(num_buckets)?;
        }
        Ok(())
    }

    pub fn begin_segment(&mut self, segment: &SegmentReader) -> crate::Result<()> {
        for (_, collector) in &mut self.collectors {
            collector.begin_segment(segment)?;
        }
        Ok(())
    }

    #[inline]
    pub fn collect(&mut self, doc: DocId, score: Score, bucket_ord: u32) -> crate::Result<()> {
        for (_, collector) in &mut self.collectors {
            collector.collect(doc, score, bucket_ord)?;
        }
        Ok(())
    }

    pub fn end(&mut self) -> crate::Result<()> {
        for (_, collector) in &mut self.collectors {
            collector.end()?;
        }
        Ok(())
    }

    pub fn bucket_results(&self, bucket_ord: u32) -> crate::Result<FxHashMap<String, MetricResult>> {
        self.collectors
            .iter()
            .map(|(name, collector)| Ok((name.clone(), collector.bucket_result(bucket_ord)?)))
            .collect()
    }
}
