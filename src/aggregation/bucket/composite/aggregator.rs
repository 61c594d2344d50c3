//! Two pass collection of the composite aggregation.
//!
//! The first pass feeds the matching docs to the key queue, segment by
//! segment, and records the docs that made it in the queue when nested
//! aggregations are requested. Once every segment was scanned the queue is
//! final. The second pass replays the recorded docs, and forwards those whose
//! key survived to the nested collectors.

use common::{BitSet, ByteCount, DocIdSetBuilder};
use log::debug;
use rustc_hash::FxHashSet;

use super::queue::CompositeValuesCollectorQueue;
use super::sorted_docs::collect_sorted_docs;
use super::values_source::ValuesSource;
use super::CompositeAggregationRequest;
use crate::aggregation::agg_limits::{AggregationLimits, ResourceLimitGuard};
use crate::aggregation::agg_result::{CompositeAggregationResult, CompositeBucket};
use crate::aggregation::metric::StatsCollector;
use crate::aggregation::sub_aggregation::{BucketCollector, SubAggregationCollectors};
use crate::collector::{CollectionSignal, Collector};
use crate::docset::DocSet;
use crate::query::Query;
use crate::{AggregationError, DocId, Score, Searcher, SegmentOrdinal, SegmentReader};

/// Docs of one segment recorded for the second pass.
struct Entry {
    segment_ord: SegmentOrdinal,
    docs: BitSet,
    num_bytes: ByteCount,
}

/// Docs of the segment being collected.
struct SegmentDocs {
    segment_ord: SegmentOrdinal,
    builder: DocIdSetBuilder,
}

impl SegmentDocs {
    fn new(reader: &SegmentReader) -> SegmentDocs {
        SegmentDocs {
            segment_ord: reader.segment_ord(),
            builder: DocIdSetBuilder::new(reader.max_doc()),
        }
    }

    fn record(&mut self, doc: DocId, guard: &mut ResourceLimitGuard) -> crate::Result<()> {
        if !self.builder.is_allocated() {
            guard.add_memory_consumed(self.builder.num_bytes_on_first_insert().get_bytes())?;
        }
        self.builder.add(doc);
        Ok(())
    }

    fn seal(self) -> Option<Entry> {
        let docs = self.builder.build()?;
        Some(Entry {
            segment_ord: self.segment_ord,
            num_bytes: docs.num_bytes(),
            docs,
        })
    }
}

/// Collector computing one page of a composite aggregation.
///
/// ```
/// use composite_agg::aggregation::bucket::{CompositeAggregationRequest, CompositeAggregator};
/// use composite_agg::aggregation::AggregationLimits;
/// use composite_agg::query::AllQuery;
/// use composite_agg::schema::{Schema, FAST};
/// use composite_agg::{doc, Index};
///
/// # fn main() -> composite_agg::Result<()> {
/// let mut schema_builder = Schema::builder();
/// let color = schema_builder.add_str_field("color", FAST);
/// let index = Index::create_in_ram(schema_builder.build());
/// let mut index_writer = index.writer();
/// index_writer.add_document(doc!(color => "red"))?;
/// index_writer.add_document(doc!(color => "blue"))?;
/// index_writer.add_document(doc!(color => "red"))?;
/// index_writer.commit()?;
///
/// let request: CompositeAggregationRequest = serde_json::from_str(
///     r#"{"composite": {"sources": [{"color": {"terms": {"field": "color"}}}]}}"#,
/// )
/// .unwrap();
/// let searcher = index.searcher();
/// let limits = AggregationLimits::default();
/// let collector = CompositeAggregator::new(&request, &searcher, &AllQuery, &limits)?;
/// let result = searcher.search(&AllQuery, collector)?;
/// assert_eq!(result.buckets.len(), 2);
/// assert_eq!(result.buckets[0].doc_count, 1);
/// assert_eq!(result.buckets[1].doc_count, 2);
/// # Ok(())
/// # }
/// ```
pub struct CompositeAggregator {
    queue: CompositeValuesCollectorQueue,
    size: u32,
    searcher: Searcher,
    query: Box<dyn Query>,
    sub_aggs: SubAggregationCollectors,
    sorted_docs_enabled: bool,
    /// The index is sorted by the leading source, in the same order.
    leading_sort: bool,
    segment_docs: Option<SegmentDocs>,
    entries: Vec<Entry>,
    start_doc: DocId,
    guard: ResourceLimitGuard,
}

impl CompositeAggregator {
    /// Creates the collector of `request`.
    ///
    /// `query` must be the query the collector is run with. The request is
    /// validated before anything gets allocated.
    pub fn new(
        request: &CompositeAggregationRequest,
        searcher: &Searcher,
        query: &dyn Query,
        limits: &AggregationLimits,
    ) -> crate::Result<CompositeAggregator> {
        let composite = &request.composite;
        let bucket_limit = limits.get_bucket_limit();
        if composite.size > bucket_limit {
            return Err(AggregationError::TooManyBuckets {
                limit: bucket_limit,
                requested: composite.size,
            });
        }
        if composite.sources.is_empty() {
            return Err(AggregationError::InvalidArgument(
                "composite aggregation needs at least one source".to_string(),
            ));
        }
        let mut names = FxHashSet::default();
        for source in &composite.sources {
            if !names.insert(source.name()) {
                return Err(AggregationError::InvalidArgument(format!(
                    "duplicate source name '{}' in composite aggregation",
                    source.name()
                )));
            }
        }
        if !composite.after.is_empty() {
            if composite.after.len() != composite.sources.len() {
                return Err(AggregationError::InvalidArgument(format!(
                    "after key has {} values, the composite aggregation has {} sources",
                    composite.after.len(),
                    composite.sources.len()
                )));
            }
            if let Some(source) = composite
                .sources
                .iter()
                .find(|source| !composite.after.contains_key(source.name()))
            {
                return Err(AggregationError::InvalidArgument(format!(
                    "after key has no value for source '{}'",
                    source.name()
                )));
            }
        }
        let size = composite.size as usize;
        let sources = composite
            .sources
            .iter()
            .map(|req| {
                ValuesSource::from_req(req, searcher, composite.after.get(req.name()), size, limits)
            })
            .collect::<crate::Result<Vec<_>>>()?;
        let leading_sort = is_leading_sort(searcher, &sources[0])?;
        let queue = CompositeValuesCollectorQueue::new(
            sources,
            size,
            !composite.after.is_empty(),
            limits.new_guard(),
        );
        let mut aggregator = CompositeAggregator {
            queue,
            size: composite.size,
            searcher: searcher.clone(),
            query: query.box_clone(),
            sub_aggs: SubAggregationCollectors::default(),
            sorted_docs_enabled: true,
            leading_sort,
            segment_docs: None,
            entries: Vec::new(),
            start_doc: 0,
            guard: limits.new_guard(),
        };
        let mut sub_agg_names: Vec<&String> = request.aggs.keys().collect();
        sub_agg_names.sort();
        for name in sub_agg_names {
            let collector = StatsCollector::from_req(&request.aggs[name], searcher.schema(), limits)?;
            aggregator.add_sub_aggregation(name.clone(), Box::new(collector))?;
        }
        Ok(aggregator)
    }

    /// Nests a collector in every bucket. Its results are reported under
    /// `name`.
    pub fn add_sub_aggregation(
        &mut self,
        name: impl Into<String>,
        collector: Box<dyn BucketCollector>,
    ) -> crate::Result<()> {
        let name = name.into();
        if name == "key" || name == "doc_count" || self.sub_aggs.contains(&name) {
            return Err(AggregationError::InvalidArgument(format!(
                "sub-aggregation name '{name}' is reserved or already used"
            )));
        }
        self.sub_aggs.push(name, collector);
        Ok(())
    }

    /// Enables or disables walking the segments in the order of the leading
    /// source. Enabled by default. The result is the same either way.
    pub fn set_sorted_docs_optimization(&mut self, enabled: bool) {
        self.sorted_docs_enabled = enabled;
    }

    fn can_walk_sorted_docs(&self) -> bool {
        let lead = &self.queue.sources()[0];
        self.sorted_docs_enabled
            && self.query.is_match_all()
            && lead.has_sorted_buckets()
            && lead.order().is_asc()
            && !lead.missing_bucket()
            && self
                .searcher
                .schema()
                .get_field_entry(lead.field())
                .is_indexed()
    }

    /// Seals the docs recorded for the previous segment.
    fn finish_leaf(&mut self) {
        if let Some(entry) = self.segment_docs.take().and_then(SegmentDocs::seal) {
            self.entries.push(entry);
        }
        self.queue.reset_early_terminate();
        self.queue.set_leading_sort(false);
        self.start_doc = 0;
    }

    /// First doc whose leading value is not before the after key.
    ///
    /// Docs are sorted by the leading value, docs without one come last.
    fn compute_start_doc(&mut self, reader: &SegmentReader) -> crate::Result<DocId> {
        let lead = &mut self.queue.sources_mut()[0];
        let mut low = 0;
        let mut high = reader.max_doc();
        while low < high {
            let mid = low + (high - low) / 2;
            lead.load_doc(mid)?;
            let is_before_after = if lead.num_choices() == 0 {
                false
            } else {
                lead.set_choice(0);
                lead.compare_current_with_after().is_lt()
            };
            if is_before_after {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        Ok(low)
    }

    /// Replays the recorded docs through the nested collectors.
    fn replay(&mut self) -> crate::Result<()> {
        self.sub_aggs.begin(self.queue.num_slots())?;
        let weight = if self.sub_aggs.requires_scoring() {
            Some(self.query.weight(&self.searcher, true)?)
        } else {
            None
        };
        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            let reader = self
                .searcher
                .segment_reader(entry.segment_ord)
                .ok_or_else(|| {
                    AggregationError::InternalError(format!(
                        "unknown segment {} in recorded docs",
                        entry.segment_ord
                    ))
                })?
                .clone();
            for source in self.queue.sources_mut() {
                source.begin_segment(&reader)?;
            }
            self.sub_aggs.begin_segment(&reader)?;
            let mut scorer = match &weight {
                Some(weight) => Some(weight.scorer(&reader)?),
                None => None,
            };
            let mut num_replayed = 0u64;
            for doc in entry.docs.iter() {
                let score: Score = match scorer.as_mut() {
                    Some(scorer) => {
                        if scorer.seek(doc) != doc {
                            return Err(AggregationError::ReplayInconsistency(format!(
                                "doc {doc} of segment {} has no score",
                                entry.segment_ord
                            )));
                        }
                        scorer.score()
                    }
                    None => 0.0,
                };
                self.queue.for_each_combination(doc, false, |queue| {
                    if let Some(slot) = queue.get_current_slot() {
                        num_replayed += 1;
                        self.sub_aggs.collect(doc, score, slot)?;
                    }
                    Ok(())
                })?;
            }
            debug!(
                "replayed {num_replayed} keys from {} docs of segment {}",
                entry.docs.len(),
                entry.segment_ord
            );
            self.guard.release_memory(entry.num_bytes.get_bytes());
        }
        self.sub_aggs.end()
    }
}

/// Returns true if every segment is sorted by the field of `lead`, in the
/// order of `lead`.
fn is_leading_sort(searcher: &Searcher, lead: &ValuesSource) -> crate::Result<bool> {
    let Some(sort_by_field) = &searcher.index_settings().sort_by_field else {
        return Ok(false);
    };
    if sort_by_field.order != lead.order()
        || lead.missing_bucket()
        || !lead.has_sorted_buckets()
        || searcher.schema().get_field(&sort_by_field.field)? != lead.field()
    {
        return Ok(false);
    }
    for reader in searcher.segment_readers() {
        if !reader.column(lead.field())?.is_single_valued() {
            return Ok(false);
        }
    }
    Ok(true)
}

impl Collector for CompositeAggregator {
    type Fruit = CompositeAggregationResult;

    fn requires_scoring(&self) -> bool {
        self.sub_aggs.requires_scoring()
    }

    fn begin_segment(&mut self, segment: &SegmentReader) -> crate::Result<CollectionSignal> {
        self.finish_leaf();
        if self.size == 0 {
            return Ok(CollectionSignal::TerminateScan);
        }
        for source in self.queue.sources_mut() {
            source.begin_segment(segment)?;
        }
        self.segment_docs = Some(SegmentDocs::new(segment));
        let record_docs = !self.sub_aggs.is_empty();
        if self.can_walk_sorted_docs() {
            let segment_docs = &mut self.segment_docs;
            let guard = &mut self.guard;
            collect_sorted_docs(&mut self.queue, segment, |queue, doc| {
                let outcome = queue.collect_doc(doc, true)?;
                if record_docs && outcome.num_accepted > 0 {
                    if let Some(segment_docs) = segment_docs.as_mut() {
                        segment_docs.record(doc, guard)?;
                    }
                }
                Ok(outcome)
            })?;
            return Ok(CollectionSignal::TerminateSegment);
        }
        if self.leading_sort {
            self.queue.set_leading_sort(true);
            if self.queue.has_after_key() {
                self.start_doc = self.compute_start_doc(segment)?;
            }
            debug!(
                "segment {} is sorted by the leading source, starting at doc {}",
                segment.segment_ord(),
                self.start_doc
            );
        }
        Ok(CollectionSignal::Continue)
    }

    fn start_doc(&self) -> DocId {
        self.start_doc
    }

    fn collect(&mut self, doc: DocId, _score: Score) -> crate::Result<CollectionSignal> {
        if self.queue.is_early_terminate() {
            return Ok(CollectionSignal::TerminateSegment);
        }
        let outcome = self.queue.collect_doc(doc, false)?;
        if outcome.num_accepted > 0 && !self.sub_aggs.is_empty() {
            if let Some(segment_docs) = self.segment_docs.as_mut() {
                segment_docs.record(doc, &mut self.guard)?;
            }
        }
        if self.queue.is_early_terminate() {
            return Ok(CollectionSignal::TerminateSegment);
        }
        Ok(CollectionSignal::Continue)
    }

    fn harvest(mut self) -> crate::Result<CompositeAggregationResult> {
        self.finish_leaf();
        let slots = self.queue.drain_sorted();
        if !self.sub_aggs.is_empty() && !slots.is_empty() {
            self.replay()?;
        }
        let buckets = slots
            .into_iter()
            .map(|slot| {
                let key = self
                    .queue
                    .sources()
                    .iter()
                    .map(|source| Ok((source.name().to_string(), source.key_for_slot(slot)?)))
                    .collect::<crate::Result<_>>()?;
                Ok(CompositeBucket {
                    key,
                    doc_count: self.queue.doc_count(slot),
                    sub_aggregation: self.sub_aggs.bucket_results(slot)?,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;
        let after_key = buckets.last().map(|bucket| bucket.key.clone());
        Ok(CompositeAggregationResult { buckets, after_key })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::aggregation::agg_result::CompositeKey;
    use crate::query::{AllQuery, TermQuery};
    use crate::schema::{FAST, INDEXED, Schema};
    use crate::{Index, IndexSettings, IndexSortByField, Order};

    fn request(value: serde_json::Value) -> CompositeAggregationRequest {
        serde_json::from_value(value).unwrap()
    }

    fn keys(result: &CompositeAggregationResult, name: &str) -> Vec<CompositeKey> {
        result
            .buckets
            .iter()
            .map(|bucket| bucket.key[name].clone())
            .collect()
    }

    fn sorted_index(order: Order) -> crate::Result<Index> {
        let mut schema_builder = Schema::builder();
        let num = schema_builder.add_i64_field("num", FAST | INDEXED);
        let tag = schema_builder.add_str_field("tag", FAST | INDEXED);
        let index = Index::builder()
            .schema(schema_builder.build())
            .settings(IndexSettings {
                sort_by_field: Some(IndexSortByField {
                    field: "num".to_string(),
                    order,
                }),
            })
            .create_in_ram()?;
        let mut index_writer = index.writer();
        for val in [5i64, 1, 4, 2, 3, 2, 6] {
            let tag_val = if val % 2 == 0 { "even" } else { "odd" };
            index_writer.add_document(doc!(num => val, tag => tag_val))?;
        }
        index_writer.add_document(doc!(tag => "none"))?;
        index_writer.commit()?;
        Ok(index)
    }

    #[test]
    fn test_leading_sort_with_after_key() -> crate::Result<()> {
        let index = sorted_index(Order::Asc)?;
        let searcher = index.searcher();
        let req = request(json!({
            "composite": {
                "sources": [{"num": {"terms": {"field": "num"}}}],
                "size": 2,
                "after": {"num": 2}
            }
        }));
        let limits = AggregationLimits::default();
        let mut collector = CompositeAggregator::new(&req, &searcher, &AllQuery, &limits)?;
        assert!(collector.leading_sort);
        collector.set_sorted_docs_optimization(false);
        let reader = &searcher.segment_readers()[0];
        assert_eq!(collector.begin_segment(reader)?, CollectionSignal::Continue);
        // docs are 1, 2, 2, 3, ...: the scan starts on the first 2
        assert_eq!(collector.start_doc(), 1);
        let result = searcher.search(&AllQuery, collector)?;
        assert_eq!(keys(&result, "num"), vec![CompositeKey::I64(3), CompositeKey::I64(4)]);
        Ok(())
    }

    #[test]
    fn test_leading_sort_early_termination() -> crate::Result<()> {
        let index = sorted_index(Order::Desc)?;
        let searcher = index.searcher();
        let req = request(json!({
            "composite": {
                "sources": [{"num": {"terms": {"field": "num", "order": "desc"}}}],
                "size": 2
            }
        }));
        let limits = AggregationLimits::default();
        let mut collector = CompositeAggregator::new(&req, &searcher, &AllQuery, &limits)?;
        let reader = &searcher.segment_readers()[0];
        assert_eq!(collector.begin_segment(reader)?, CollectionSignal::Continue);
        assert_eq!(collector.collect(0, 1.0)?, CollectionSignal::Continue);
        assert_eq!(collector.collect(1, 1.0)?, CollectionSignal::Continue);
        assert_eq!(collector.collect(2, 1.0)?, CollectionSignal::TerminateSegment);
        let result = collector.harvest()?;
        assert_eq!(keys(&result, "num"), vec![CompositeKey::I64(6), CompositeKey::I64(5)]);
        Ok(())
    }

    #[test]
    fn test_leading_sort_needs_same_order() -> crate::Result<()> {
        let index = sorted_index(Order::Asc)?;
        let searcher = index.searcher();
        let limits = AggregationLimits::default();
        let req = request(json!({
            "composite": {"sources": [{"num": {"terms": {"field": "num", "order": "desc"}}}]}
        }));
        assert!(!CompositeAggregator::new(&req, &searcher, &AllQuery, &limits)?.leading_sort);
        let req = request(json!({
            "composite": {"sources": [{"tag": {"terms": {"field": "tag"}}}]}
        }));
        assert!(!CompositeAggregator::new(&req, &searcher, &AllQuery, &limits)?.leading_sort);
        let req = request(json!({
            "composite": {"sources": [{"num": {"terms": {"field": "num", "missing_bucket": true}}}]}
        }));
        assert!(!CompositeAggregator::new(&req, &searcher, &AllQuery, &limits)?.leading_sort);
        Ok(())
    }

    #[test]
    fn test_sorted_docs_only_for_match_all() -> crate::Result<()> {
        let index = sorted_index(Order::Asc)?;
        let searcher = index.searcher();
        let limits = AggregationLimits::default();
        let req = request(json!({
            "composite": {"sources": [{"tag": {"terms": {"field": "tag"}}}]}
        }));
        let collector = CompositeAggregator::new(&req, &searcher, &AllQuery, &limits)?;
        assert!(collector.can_walk_sorted_docs());
        let term_query = TermQuery::new(searcher.schema().get_field("tag")?, "odd");
        let collector = CompositeAggregator::new(&req, &searcher, &term_query, &limits)?;
        assert!(!collector.can_walk_sorted_docs());
        let result = searcher.search(&term_query, collector)?;
        assert_eq!(keys(&result, "tag"), vec![CompositeKey::from("odd")]);
        assert_eq!(result.buckets[0].doc_count, 3);
        Ok(())
    }

    #[test]
    fn test_recorded_docs_are_released() -> crate::Result<()> {
        let index = sorted_index(Order::Asc)?;
        let searcher = index.searcher();
        let limits = AggregationLimits::default();
        let req = request(json!({
            "composite": {"sources": [{"tag": {"terms": {"field": "tag"}}}], "size": 1},
            "aggs": {"total": {"sum": {"field": "num"}}}
        }));
        let collector = CompositeAggregator::new(&req, &searcher, &AllQuery, &limits)?;
        let result = searcher.search(&AllQuery, collector)?;
        assert_eq!(keys(&result, "tag"), vec![CompositeKey::from("even")]);
        assert_eq!(
            serde_json::to_value(&result.buckets[0]).unwrap(),
            json!({"key": {"tag": "even"}, "doc_count": 4, "total": {"value": 14.0}})
        );
        assert_eq!(limits.memory_consumed(), 0u64);
        Ok(())
    }

    #[test]
    fn test_reserved_sub_aggregation_name() -> crate::Result<()> {
        let index = sorted_index(Order::Asc)?;
        let searcher = index.searcher();
        let limits = AggregationLimits::default();
        let req = request(json!({
            "composite": {"sources": [{"tag": {"terms": {"field": "tag"}}}]},
            "aggs": {"doc_count": {"sum": {"field": "num"}}}
        }));
        assert!(matches!(
            CompositeAggregator::new(&req, &searcher, &AllQuery, &limits),
            Err(AggregationError::InvalidArgument(_))
        ));
        Ok(())
    }
}
