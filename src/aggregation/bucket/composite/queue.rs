use std::cmp::Ordering;
use std::hash::Hasher;

use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use super::values_source::ValuesSource;
use crate::DocId;
use crate::aggregation::agg_limits::{MemoryConsumption, ResourceLimitGuard, push_tracked};

/// What happened to the keys of one doc.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(super) struct DocOutcome {
    /// The doc produced at least one key.
    pub had_candidates: bool,
    /// Number of keys that made it in the queue.
    pub num_accepted: usize,
}

/// Bounded set of the smallest composite keys seen so far.
///
/// Keys live in slots `0..max_size`. A slot is allocated when a key enters the
/// queue while it is not full, and is overwritten when its key gets evicted.
/// The values of a slot are stored in the sources, the queue keeps its doc
/// count and a max-heap of the slots, so that the worst resident key is on
/// top.
pub(super) struct CompositeValuesCollectorQueue {
    sources: Vec<ValuesSource>,
    max_size: usize,
    /// Max-heap of slots.
    heap: Vec<u32>,
    doc_counts: Vec<u64>,
    hashes: Vec<u64>,
    /// Hash of the key to the slots holding a key with that hash.
    map: FxHashMap<u64, SmallVec<[u32; 1]>>,
    map_num_bytes: u64,
    after_key_set: bool,
    leading_sort: bool,
    early_terminate: bool,
    guard: ResourceLimitGuard,
}

impl CompositeValuesCollectorQueue {
    pub fn new(
        sources: Vec<ValuesSource>,
        max_size: usize,
        after_key_set: bool,
        guard: ResourceLimitGuard,
    ) -> CompositeValuesCollectorQueue {
        CompositeValuesCollectorQueue {
            sources,
            max_size,
            heap: Vec::new(),
            doc_counts: Vec::new(),
            hashes: Vec::new(),
            map: FxHashMap::default(),
            map_num_bytes: 0,
            after_key_set,
            leading_sort: false,
            early_terminate: false,
            guard,
        }
    }

    pub fn sources(&self) -> &[ValuesSource] {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut [ValuesSource] {
        &mut self.sources
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.max_size
    }

    /// Number of slots ever allocated.
    pub fn num_slots(&self) -> usize {
        self.doc_counts.len()
    }

    pub fn has_after_key(&self) -> bool {
        self.after_key_set
    }

    /// Slot of the worst resident key.
    pub fn top_slot(&self) -> Option<u32> {
        self.heap.first().copied()
    }

    /// Tells the queue that docs are visited in the order of the leading
    /// source, which lets it stop the segment on the first doc whose leading
    /// value is not competitive.
    pub fn set_leading_sort(&mut self, leading_sort: bool) {
        self.leading_sort = leading_sort;
    }

    pub fn is_early_terminate(&self) -> bool {
        self.early_terminate
    }

    pub fn reset_early_terminate(&mut self) {
        self.early_terminate = false;
    }

    pub fn doc_count(&self, slot: u32) -> u64 {
        self.doc_counts.get(slot as usize).copied().unwrap_or(0)
    }

    /// Loads `doc` into the sources, then calls `visit` once for every
    /// combination of their values. The leading source is not loaded if
    /// `lead_forced` is set, its current value is used as is.
    ///
    /// Returns the number of combinations visited, 0 if a source has no
    /// value for the doc.
    pub fn for_each_combination(
        &mut self,
        doc: DocId,
        lead_forced: bool,
        mut visit: impl FnMut(&mut Self) -> crate::Result<()>,
    ) -> crate::Result<usize> {
        let first_loaded = usize::from(lead_forced);
        for source in &mut self.sources[first_loaded..] {
            source.load_doc(doc)?;
        }
        let num_choices: SmallVec<[usize; 4]> = self
            .sources
            .iter()
            .enumerate()
            .map(|(dim, source)| {
                if dim < first_loaded {
                    1
                } else {
                    source.num_choices()
                }
            })
            .collect();
        if num_choices.contains(&0) {
            return Ok(0);
        }
        for source in &mut self.sources[first_loaded..] {
            source.set_choice(0);
        }
        let mut positions: SmallVec<[usize; 4]> = SmallVec::from_elem(0, self.sources.len());
        let mut num_visited = 0;
        loop {
            visit(self)?;
            num_visited += 1;
            // odometer over the dimensions, the last one spinning fastest
            let mut dim = self.sources.len();
            loop {
                if dim == first_loaded {
                    return Ok(num_visited);
                }
                dim -= 1;
                positions[dim] += 1;
                if positions[dim] < num_choices[dim] {
                    self.sources[dim].set_choice(positions[dim]);
                    break;
                }
                positions[dim] = 0;
                self.sources[dim].set_choice(0);
            }
        }
    }

    /// Offers every key of `doc` to the queue.
    pub fn collect_doc(&mut self, doc: DocId, lead_forced: bool) -> crate::Result<DocOutcome> {
        let mut num_accepted = 0;
        let num_candidates = self.for_each_combination(doc, lead_forced, |queue| {
            if queue.add_if_competitive()?.is_some() {
                num_accepted += 1;
            }
            Ok(())
        })?;
        Ok(DocOutcome {
            had_candidates: num_candidates > 0,
            num_accepted,
        })
    }

    fn hash_current(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for source in &self.sources {
            source.hash_current(&mut hasher);
        }
        hasher.finish()
    }

    /// Compares the current values with a slot. Also returns the first
    /// dimension that differs.
    fn compare_current_with_slot(&self, slot: u32) -> (Ordering, usize) {
        for (dim, source) in self.sources.iter().enumerate() {
            let cmp = source.compare_current(slot);
            if cmp != Ordering::Equal {
                return (cmp, dim);
            }
        }
        (Ordering::Equal, self.sources.len())
    }

    fn compare_current_with_after(&self) -> Ordering {
        self.sources
            .iter()
            .map(ValuesSource::compare_current_with_after)
            .find(|cmp| *cmp != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    fn compare_slots(&self, left: u32, right: u32) -> Ordering {
        self.sources
            .iter()
            .map(|source| source.compare(left, right))
            .find(|cmp| *cmp != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    fn find_current(&self, hash: u64) -> Option<u32> {
        self.map.get(&hash)?.iter().copied().find(|&slot| {
            self.sources
                .iter()
                .all(|source| source.compare_current(slot) == Ordering::Equal)
        })
    }

    /// Slot holding the current key, if it is resident.
    pub fn get_current_slot(&self) -> Option<u32> {
        self.find_current(self.hash_current())
    }

    fn insert_in_map(&mut self, hash: u64, slot: u32) -> crate::Result<()> {
        self.map.entry(hash).or_default().push(slot);
        let num_bytes = self.map.memory_consumption() as u64;
        if num_bytes > self.map_num_bytes {
            let additional = num_bytes - self.map_num_bytes;
            self.map_num_bytes = num_bytes;
            self.guard.add_memory_consumed(additional)?;
        }
        Ok(())
    }

    fn remove_from_map(&mut self, hash: u64, slot: u32) {
        if let Some(slots) = self.map.get_mut(&hash) {
            slots.retain(|other| *other != slot);
            if slots.is_empty() {
                self.map.remove(&hash);
            }
        }
    }

    fn copy_current(&mut self, slot: u32) -> crate::Result<()> {
        for source in &mut self.sources {
            source.copy_current(slot)?;
        }
        Ok(())
    }

    /// Adds the current key to the queue if it is competitive.
    ///
    /// A resident key gets its doc count incremented. Otherwise the key must
    /// be after the after key, and either find a free slot or be better than
    /// the worst resident key, which gets evicted. Returns the slot of the
    /// key, or `None` if it was rejected.
    pub fn add_if_competitive(&mut self) -> crate::Result<Option<u32>> {
        if self.max_size == 0 {
            return Ok(None);
        }
        let hash = self.hash_current();
        if let Some(slot) = self.find_current(hash) {
            self.doc_counts[slot as usize] += 1;
            return Ok(Some(slot));
        }
        if self.after_key_set && self.compare_current_with_after() != Ordering::Greater {
            return Ok(None);
        }
        if let Some(top) = self.top_slot().filter(|_| self.is_full()) {
            let (cmp, dim) = self.compare_current_with_slot(top);
            if cmp != Ordering::Less {
                if self.leading_sort && dim == 0 {
                    // docs come sorted by the leading value, the following
                    // ones cannot be competitive either
                    self.early_terminate = true;
                }
                return Ok(None);
            }
            self.remove_from_map(self.hashes[top as usize], top);
            self.copy_current(top)?;
            self.doc_counts[top as usize] = 1;
            self.hashes[top as usize] = hash;
            self.insert_in_map(hash, top)?;
            self.sift_down(0);
            return Ok(Some(top));
        }
        let slot = self.doc_counts.len() as u32;
        self.copy_current(slot)?;
        push_tracked(&mut self.doc_counts, 1, self.max_size, &mut self.guard)?;
        push_tracked(&mut self.hashes, hash, self.max_size, &mut self.guard)?;
        push_tracked(&mut self.heap, slot, self.max_size, &mut self.guard)?;
        self.insert_in_map(hash, slot)?;
        self.sift_up(self.heap.len() - 1);
        Ok(Some(slot))
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.compare_slots(self.heap[pos], self.heap[parent]) != Ordering::Greater {
                break;
            }
            self.heap.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut largest = left;
            if right < len
                && self.compare_slots(self.heap[right], self.heap[left]) == Ordering::Greater
            {
                largest = right;
            }
            if self.compare_slots(self.heap[largest], self.heap[pos]) != Ordering::Greater {
                break;
            }
            self.heap.swap(pos, largest);
            pos = largest;
        }
    }

    fn pop(&mut self) -> Option<u32> {
        let last = self.heap.len().checked_sub(1)?;
        self.heap.swap(0, last);
        let top = self.heap.pop();
        self.sift_down(0);
        top
    }

    /// Empties the heap and returns the slots in ascending key order.
    ///
    /// The slots keep their values and counts, and `get_current_slot` still
    /// finds them.
    pub fn drain_sorted(&mut self) -> Vec<u32> {
        let mut sorted = vec![0u32; self.heap.len()];
        // pops yield the worst key first, fill back to front
        for pos in (0..sorted.len()).rev() {
            if let Some(slot) = self.pop() {
                sorted[pos] = slot;
            }
        }
        sorted
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;
    use serde_json::json;

    use super::*;
    use crate::aggregation::AggregationLimits;
    use crate::aggregation::agg_result::CompositeKey;
    use crate::aggregation::bucket::CompositeAggregation;
    use crate::schema::{FAST, Schema};
    use crate::{AggregationError, Index};

    fn build_queue(
        index: &Index,
        sources: serde_json::Value,
        after: serde_json::Value,
        size: usize,
        limits: &AggregationLimits,
    ) -> crate::Result<CompositeValuesCollectorQueue> {
        let composite: CompositeAggregation =
            serde_json::from_value(json!({"sources": sources, "after": after})).unwrap();
        let searcher = index.searcher();
        let sources = composite
            .sources
            .iter()
            .map(|req| {
                ValuesSource::from_req(req, &searcher, composite.after.get(req.name()), size, limits)
            })
            .collect::<crate::Result<Vec<_>>>()?;
        let mut queue =
            CompositeValuesCollectorQueue::new(sources, size, !composite.after.is_empty(), limits.new_guard());
        for source in queue.sources_mut() {
            source.begin_segment(&searcher.segment_readers()[0])?;
        }
        Ok(queue)
    }

    fn collect_all(queue: &mut CompositeValuesCollectorQueue, num_docs: DocId) -> crate::Result<()> {
        for doc in 0..num_docs {
            queue.collect_doc(doc, false)?;
        }
        Ok(())
    }

    fn drained(queue: &mut CompositeValuesCollectorQueue) -> crate::Result<Vec<(Vec<CompositeKey>, u64)>> {
        queue
            .drain_sorted()
            .into_iter()
            .map(|slot| {
                let key = queue
                    .sources()
                    .iter()
                    .map(|source| source.key_for_slot(slot))
                    .collect::<crate::Result<Vec<_>>>()?;
                Ok((key, queue.doc_count(slot)))
            })
            .collect()
    }

    fn numbers_index(values: &[i64]) -> crate::Result<Index> {
        let mut schema_builder = Schema::builder();
        let num = schema_builder.add_i64_field("num", FAST);
        let index = Index::create_in_ram(schema_builder.build());
        let mut index_writer = index.writer();
        for &value in values {
            index_writer.add_document(doc!(num => value))?;
        }
        index_writer.commit()?;
        Ok(index)
    }

    #[test]
    fn test_queue_keeps_smallest_keys_with_exact_counts() -> crate::Result<()> {
        let values = [5, 3, 9, 3, 1, 5, 7, 1, 1, 2];
        let index = numbers_index(&values)?;
        let limits = AggregationLimits::default();
        let mut queue = build_queue(&index, json!([{"num": {"terms": {"field": "num"}}}]), json!({}), 3, &limits)?;
        collect_all(&mut queue, values.len() as DocId)?;
        assert!(queue.is_full());
        assert_eq!(
            drained(&mut queue)?,
            vec![
                (vec![CompositeKey::I64(1)], 3),
                (vec![CompositeKey::I64(2)], 1),
                (vec![CompositeKey::I64(3)], 2),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_queue_desc_order_and_after_key() -> crate::Result<()> {
        let values = [5, 3, 9, 3, 1, 5, 7];
        let index = numbers_index(&values)?;
        let limits = AggregationLimits::default();
        let mut queue = build_queue(
            &index,
            json!([{"num": {"terms": {"field": "num", "order": "desc"}}}]),
            json!({"num": 7}),
            2,
            &limits,
        )?;
        collect_all(&mut queue, values.len() as DocId)?;
        assert_eq!(
            drained(&mut queue)?,
            vec![
                (vec![CompositeKey::I64(5)], 2),
                (vec![CompositeKey::I64(3)], 2),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_queue_multi_valued_combinations() -> crate::Result<()> {
        let mut schema_builder = Schema::builder();
        let color = schema_builder.add_str_field("color", FAST);
        let size = schema_builder.add_i64_field("size", FAST);
        let index = Index::create_in_ram(schema_builder.build());
        let mut index_writer = index.writer();
        index_writer.add_document(doc!(color => "red", color => "blue", size => 1i64, size => 2i64))?;
        index_writer.add_document(doc!(color => "red", size => 2i64))?;
        index_writer.add_document(doc!(size => 2i64))?;
        index_writer.commit()?;
        let limits = AggregationLimits::default();
        let mut queue = build_queue(
            &index,
            json!([
                {"color": {"terms": {"field": "color"}}},
                {"size": {"terms": {"field": "size"}}}
            ]),
            json!({}),
            10,
            &limits,
        )?;
        let mut num_combinations = Vec::new();
        for doc in 0..3 {
            num_combinations.push(queue.for_each_combination(doc, false, |queue| {
                queue.add_if_competitive()?;
                Ok(())
            })?);
        }
        assert_eq!(num_combinations, vec![4, 1, 0]);
        let keys: FxHashMap<(String, i64), u64> = drained(&mut queue)?
            .into_iter()
            .map(|(key, count)| match (&key[0], &key[1]) {
                (CompositeKey::Str(color), CompositeKey::I64(size)) => ((color.clone(), *size), count),
                _ => panic!("unexpected key {key:?}"),
            })
            .collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[&("red".to_string(), 2)], 2);
        assert_eq!(keys[&("blue".to_string(), 1)], 1);
        Ok(())
    }

    #[test]
    fn test_queue_leading_sort_early_terminate() -> crate::Result<()> {
        let values = [1, 2, 3, 4];
        let index = numbers_index(&values)?;
        let limits = AggregationLimits::default();
        let mut queue = build_queue(&index, json!([{"num": {"terms": {"field": "num"}}}]), json!({}), 2, &limits)?;
        queue.set_leading_sort(true);
        collect_all(&mut queue, 2)?;
        assert!(!queue.is_early_terminate());
        collect_all(&mut queue, 3)?;
        assert!(queue.is_early_terminate());
        queue.reset_early_terminate();
        assert!(!queue.is_early_terminate());
        Ok(())
    }

    #[test]
    fn test_queue_current_slot_after_drain() -> crate::Result<()> {
        let values = [4, 2, 8, 2];
        let index = numbers_index(&values)?;
        let limits = AggregationLimits::default();
        let mut queue = build_queue(&index, json!([{"num": {"terms": {"field": "num"}}}]), json!({}), 2, &limits)?;
        collect_all(&mut queue, 4)?;
        let sorted = queue.drain_sorted();
        assert_eq!(queue.top_slot(), None);
        let mut current_slots = Vec::new();
        for doc in 0..4 {
            queue.for_each_combination(doc, false, |queue| {
                current_slots.push(queue.get_current_slot());
                Ok(())
            })?;
        }
        assert_eq!(
            current_slots,
            vec![Some(sorted[1]), Some(sorted[0]), None, Some(sorted[0])]
        );
        Ok(())
    }

    #[test]
    fn test_queue_zero_size() -> crate::Result<()> {
        let index = numbers_index(&[1, 2])?;
        let limits = AggregationLimits::default();
        let mut queue = build_queue(&index, json!([{"num": {"terms": {"field": "num"}}}]), json!({}), 0, &limits)?;
        collect_all(&mut queue, 2)?;
        assert!(queue.drain_sorted().is_empty());
        Ok(())
    }

    #[test]
    fn test_queue_memory_limit() -> crate::Result<()> {
        let values: Vec<i64> = (0..100).collect();
        let index = numbers_index(&values)?;
        let limits = AggregationLimits::new(Some(200), None);
        let mut queue = build_queue(&index, json!([{"num": {"terms": {"field": "num"}}}]), json!({}), 100, &limits)?;
        let err = collect_all(&mut queue, 100).unwrap_err();
        assert!(matches!(err, AggregationError::MemoryExceeded { .. }));
        drop(queue);
        assert_eq!(limits.memory_consumed(), 0u64);
        Ok(())
    }
}
