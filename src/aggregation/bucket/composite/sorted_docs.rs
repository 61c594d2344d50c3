//! Collection of a segment in the order of the leading source.
//!
//! When the leading source is backed by postings, the segment can be walked
//! value by value instead of doc by doc. Since the smallest leading values
//! come first, the walk stops as soon as a leading value can no longer
//! produce a competitive key.

use std::ops::Range;

use itertools::Itertools;
use log::debug;

use super::queue::{CompositeValuesCollectorQueue, DocOutcome};
use crate::postings::InvertedIndex;
use crate::{AggregationError, DocId, SegmentReader};

/// A distinct value of the leading source, with the range of postings terms
/// whose docs hold it. Rounded sources map several terms to one value.
#[derive(Clone, Debug)]
pub(super) struct LeadBucket<V> {
    pub(super) value: V,
    pub(super) terms: Range<usize>,
}

/// Docs of the postings terms in `terms`, ascending and de-duplicated.
pub(super) fn bucket_docs(index: &InvertedIndex, terms: Range<usize>) -> Vec<DocId> {
    match index {
        InvertedIndex::Terms { postings, .. } => terms
            .map(|term_idx| postings.doc_ids(term_idx).iter().copied())
            .kmerge()
            .dedup()
            .collect(),
        InvertedIndex::I64(postings) => terms
            .map(|term_idx| postings.doc_ids(term_idx).iter().copied())
            .kmerge()
            .dedup()
            .collect(),
    }
}

/// Collects every doc of the segment, bucket by bucket of the leading source.
///
/// `collect_doc` is called with the leading source forced to the value of the
/// bucket, and must only enumerate the other dimensions.
///
/// Returns the number of buckets visited.
pub(super) fn collect_sorted_docs(
    queue: &mut CompositeValuesCollectorQueue,
    reader: &SegmentReader,
    mut collect_doc: impl FnMut(&mut CompositeValuesCollectorQueue, DocId) -> crate::Result<DocOutcome>,
) -> crate::Result<usize> {
    let (lead_field, num_buckets) = {
        let lead = queue.sources_mut().first_mut().ok_or_else(|| {
            AggregationError::InternalError("composite queue without sources".to_string())
        })?;
        let Some(num_buckets) = lead.prepare_sorted_buckets(reader)? else {
            return Err(AggregationError::InternalError(format!(
                "source '{}' cannot be walked in sorted order",
                lead.name()
            )));
        };
        (lead.field(), num_buckets)
    };
    let Some(inverted_index) = reader.inverted_index(lead_field) else {
        return Ok(0);
    };
    let mut num_visited = 0;
    for bucket in 0..num_buckets {
        let lead = &queue.sources()[0];
        if queue.has_after_key() && lead.compare_bucket_with_after(bucket)?.is_lt() {
            continue;
        }
        if let Some(top) = queue.top_slot().filter(|_| queue.is_full()) {
            if lead.compare_bucket_with_slot(bucket, top)?.is_gt() {
                break;
            }
        }
        let terms = lead.bucket_terms(bucket)?;
        queue.sources_mut()[0].force_bucket(bucket)?;
        let mut had_candidates = false;
        let mut num_accepted = 0;
        for doc in bucket_docs(inverted_index, terms) {
            let outcome = collect_doc(queue, doc)?;
            had_candidates |= outcome.had_candidates;
            num_accepted += outcome.num_accepted;
        }
        num_visited += 1;
        if num_visited > 1 && had_candidates && num_accepted == 0 {
            break;
        }
    }
    debug!(
        "segment {}: visited {num_visited} of {num_buckets} sorted buckets",
        reader.segment_ord()
    );
    Ok(num_visited)
}
