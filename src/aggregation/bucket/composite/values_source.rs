//! Value sources of the composite aggregation, one per dimension.
//!
//! A source extracts the values of the current doc for its field, keeps the
//! value of every slot of the queue, and compares the current value with the
//! slots and the after key. How values are read and compared depends on the
//! field type, and is abstracted by [`SourceKind`].

use std::cmp::Ordering;
use std::hash::Hasher;
use std::ops::Range;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rustc_hash::FxHasher;

use super::geotile;
use super::interval::DateRounding;
use super::sorted_docs::LeadBucket;
use super::{CompositeAggregationSource, MissingOrder};
use crate::aggregation::agg_limits::{AggregationLimits, ResourceLimitGuard, push_tracked};
use crate::aggregation::agg_result::CompositeKey;
use crate::aggregation::date::parse_date;
use crate::column::{Column, DynamicColumn, GlobalOrdinals};
use crate::index::Order;
use crate::postings::InvertedIndex;
use crate::schema::{Field, FieldType, GeoPoint};
use crate::{AggregationError, DocId, Searcher, SegmentOrdinal, SegmentReader};

/// How a source reads, orders and formats the values of its field.
pub(super) trait SourceKind {
    /// Value stored in the slots.
    type Value: Clone;
    /// Parsed value of the after key.
    type After;

    fn begin_segment(
        &mut self,
        reader: &SegmentReader,
        field: Field,
        guard: &mut ResourceLimitGuard,
    ) -> crate::Result<()>;

    /// Appends the distinct values of `doc` to `values`, in ascending order.
    fn load_doc(&mut self, doc: DocId, values: &mut Vec<Self::Value>) -> crate::Result<()>;

    /// Natural (ascending) order of the values.
    fn cmp_values(left: &Self::Value, right: &Self::Value) -> Ordering;

    fn hash_value(value: &Self::Value, hasher: &mut FxHasher);

    fn to_key(&self, value: &Self::Value) -> crate::Result<CompositeKey>;

    fn parse_after(&self, key: &CompositeKey) -> crate::Result<Self::After>;

    fn cmp_with_after(value: &Self::Value, after: &Self::After) -> Ordering;

    /// Values of the segment in ascending order, each with the range of
    /// postings terms holding its docs. `None` if the field has no postings
    /// the kind can walk.
    fn sorted_buckets(
        &self,
        _reader: &SegmentReader,
        _field: Field,
    ) -> crate::Result<Option<Vec<LeadBucket<Self::Value>>>> {
        Ok(None)
    }
}

fn invalid_after(expected: &str, key: &CompositeKey) -> AggregationError {
    AggregationError::InvalidArgument(format!("expected {expected} in after key, got {key:?}"))
}

fn unexpected_column(field_type: FieldType) -> AggregationError {
    AggregationError::InternalError(format!("unexpected {field_type:?} column for source"))
}

/// Position of an after term in the global ordinals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum OrdinalAfter {
    /// The term exists with this ordinal.
    Exact(u64),
    /// The term is absent, it sorts right before this ordinal.
    Before(u64),
}

/// Str fields, compared through global ordinals.
pub(super) struct OrdinalKind {
    global_ords: GlobalOrdinals,
    segment_ord: SegmentOrdinal,
    term_ords: Option<Column<u64>>,
}

impl OrdinalKind {
    fn new(
        searcher: &Searcher,
        field: Field,
        guard: &mut ResourceLimitGuard,
    ) -> crate::Result<OrdinalKind> {
        let dictionaries: Vec<_> = searcher
            .segment_readers()
            .iter()
            .map(|reader| match reader.column(field) {
                Ok(DynamicColumn::Str(column)) => Some(column.dictionary()),
                _ => None,
            })
            .collect();
        let global_ords = GlobalOrdinals::build(&dictionaries);
        let terms_num_bytes: u64 = (0..global_ords.num_terms())
            .filter_map(|ord| global_ords.ord_to_term(ord))
            .map(|term| (term.len() + std::mem::size_of::<Vec<u8>>()) as u64)
            .sum();
        let mappings_num_bytes: u64 = (0..dictionaries.len() as SegmentOrdinal)
            .map(|segment_ord| {
                (global_ords.segment_mapping(segment_ord).len() * std::mem::size_of::<u64>())
                    as u64
            })
            .sum();
        guard.add_memory_consumed(terms_num_bytes + mappings_num_bytes)?;
        Ok(OrdinalKind {
            global_ords,
            segment_ord: 0,
            term_ords: None,
        })
    }

    fn to_global(&self, local_ord: u64) -> crate::Result<u64> {
        self.global_ords
            .segment_mapping(self.segment_ord)
            .get(local_ord as usize)
            .copied()
            .ok_or_else(|| {
                AggregationError::InternalError(format!(
                    "term ordinal {local_ord} is missing from the global ordinals of segment {}",
                    self.segment_ord
                ))
            })
    }
}

impl SourceKind for OrdinalKind {
    type Value = u64;
    type After = OrdinalAfter;

    fn begin_segment(
        &mut self,
        reader: &SegmentReader,
        field: Field,
        _guard: &mut ResourceLimitGuard,
    ) -> crate::Result<()> {
        self.segment_ord = reader.segment_ord();
        self.term_ords = match reader.column(field)? {
            DynamicColumn::Str(column) => Some(column.term_ords().clone()),
            column => return Err(unexpected_column(column.field_type())),
        };
        Ok(())
    }

    fn load_doc(&mut self, doc: DocId, values: &mut Vec<u64>) -> crate::Result<()> {
        let Some(term_ords) = &self.term_ords else {
            return Ok(());
        };
        // the local to global mapping is monotonic, values stay sorted
        for &local_ord in term_ords.values_for_doc(doc) {
            values.push(self.to_global(local_ord)?);
        }
        Ok(())
    }

    fn cmp_values(left: &u64, right: &u64) -> Ordering {
        left.cmp(right)
    }

    fn hash_value(value: &u64, hasher: &mut FxHasher) {
        hasher.write_u64(*value);
    }

    fn to_key(&self, value: &u64) -> crate::Result<CompositeKey> {
        let term = self.global_ords.ord_to_term(*value).ok_or_else(|| {
            AggregationError::InternalError(format!("unknown global ordinal {value}"))
        })?;
        let term = std::str::from_utf8(term)
            .map_err(|err| AggregationError::InternalError(format!("invalid utf-8 term: {err}")))?;
        Ok(CompositeKey::Str(term.to_string()))
    }

    fn parse_after(&self, key: &CompositeKey) -> crate::Result<OrdinalAfter> {
        let CompositeKey::Str(term) = key else {
            return Err(invalid_after("a string", key));
        };
        Ok(match self.global_ords.term_ord(term.as_bytes()) {
            Ok(ord) => OrdinalAfter::Exact(ord),
            Err(ord) => OrdinalAfter::Before(ord),
        })
    }

    fn cmp_with_after(value: &u64, after: &OrdinalAfter) -> Ordering {
        match after {
            OrdinalAfter::Exact(ord) => value.cmp(ord),
            OrdinalAfter::Before(ord) if value < ord => Ordering::Less,
            OrdinalAfter::Before(_) => Ordering::Greater,
        }
    }

    fn sorted_buckets(
        &self,
        reader: &SegmentReader,
        field: Field,
    ) -> crate::Result<Option<Vec<LeadBucket<u64>>>> {
        let Some(InvertedIndex::Terms { postings, .. }) = reader.inverted_index(field) else {
            return Ok(None);
        };
        let buckets = (0..postings.num_terms())
            .map(|term_idx| {
                Ok(LeadBucket {
                    value: self.to_global(postings.key(term_idx))?,
                    terms: term_idx..term_idx + 1,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Some(buckets))
    }
}

/// Bytes fields. The terms of the current segment are cached.
#[derive(Default)]
pub(super) struct BytesKind {
    terms: Vec<Arc<[u8]>>,
    terms_num_bytes: u64,
    term_ords: Option<Column<u64>>,
}

impl BytesKind {
    fn term(&self, term_ord: u64) -> crate::Result<&Arc<[u8]>> {
        self.terms.get(term_ord as usize).ok_or_else(|| {
            AggregationError::InternalError(format!("unknown term ordinal {term_ord}"))
        })
    }
}

impl SourceKind for BytesKind {
    type Value = Arc<[u8]>;
    type After = Arc<[u8]>;

    fn begin_segment(
        &mut self,
        reader: &SegmentReader,
        field: Field,
        guard: &mut ResourceLimitGuard,
    ) -> crate::Result<()> {
        guard.release_memory(self.terms_num_bytes);
        self.terms_num_bytes = 0;
        self.terms.clear();
        let column = match reader.column(field)? {
            DynamicColumn::Bytes(column) => column,
            column => return Err(unexpected_column(column.field_type())),
        };
        self.terms_num_bytes = column
            .dictionary()
            .terms()
            .map(|term| (term.len() + std::mem::size_of::<Arc<[u8]>>()) as u64)
            .sum();
        guard.add_memory_consumed(self.terms_num_bytes)?;
        self.terms = column.dictionary().terms().map(Arc::from).collect();
        self.term_ords = Some(column.term_ords().clone());
        Ok(())
    }

    fn load_doc(&mut self, doc: DocId, values: &mut Vec<Arc<[u8]>>) -> crate::Result<()> {
        let Some(term_ords) = &self.term_ords else {
            return Ok(());
        };
        for &term_ord in term_ords.values_for_doc(doc) {
            values.push(Arc::clone(self.term(term_ord)?));
        }
        Ok(())
    }

    fn cmp_values(left: &Arc<[u8]>, right: &Arc<[u8]>) -> Ordering {
        left.cmp(right)
    }

    fn hash_value(value: &Arc<[u8]>, hasher: &mut FxHasher) {
        hasher.write_usize(value.len());
        hasher.write(value);
    }

    fn to_key(&self, value: &Arc<[u8]>) -> crate::Result<CompositeKey> {
        Ok(CompositeKey::Str(BASE64.encode(value)))
    }

    fn parse_after(&self, key: &CompositeKey) -> crate::Result<Arc<[u8]>> {
        let CompositeKey::Str(encoded) = key else {
            return Err(invalid_after("a base64 string", key));
        };
        let bytes = BASE64.decode(encoded).map_err(|err| {
            AggregationError::InvalidArgument(format!(
                "after key '{encoded}' is not valid base64: {err}"
            ))
        })?;
        Ok(Arc::from(bytes))
    }

    fn cmp_with_after(value: &Arc<[u8]>, after: &Arc<[u8]>) -> Ordering {
        value.cmp(after)
    }

    fn sorted_buckets(
        &self,
        reader: &SegmentReader,
        field: Field,
    ) -> crate::Result<Option<Vec<LeadBucket<Arc<[u8]>>>>> {
        let Some(InvertedIndex::Terms { postings, .. }) = reader.inverted_index(field) else {
            return Ok(None);
        };
        let buckets = (0..postings.num_terms())
            .map(|term_idx| {
                Ok(LeadBucket {
                    value: Arc::clone(self.term(postings.key(term_idx))?),
                    terms: term_idx..term_idx + 1,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Some(buckets))
    }
}

/// I64 and date fields, optionally rounded to date intervals.
pub(super) struct LongKind {
    column: Option<Column<i64>>,
    rounding: Option<DateRounding>,
    is_date: bool,
}

impl LongKind {
    fn round(&self, value: i64) -> crate::Result<i64> {
        match &self.rounding {
            Some(rounding) => rounding.round(value),
            None => Ok(value),
        }
    }
}

impl SourceKind for LongKind {
    type Value = i64;
    type After = i64;

    fn begin_segment(
        &mut self,
        reader: &SegmentReader,
        field: Field,
        _guard: &mut ResourceLimitGuard,
    ) -> crate::Result<()> {
        self.column = match reader.column(field)? {
            DynamicColumn::I64(column) | DynamicColumn::Date(column) => Some(column.clone()),
            column => return Err(unexpected_column(column.field_type())),
        };
        Ok(())
    }

    fn load_doc(&mut self, doc: DocId, values: &mut Vec<i64>) -> crate::Result<()> {
        let Some(column) = &self.column else {
            return Ok(());
        };
        for &value in column.values_for_doc(doc) {
            // rounding is monotonic, equal rounded values are adjacent
            let value = self.round(value)?;
            if values.last() != Some(&value) {
                values.push(value);
            }
        }
        Ok(())
    }

    fn cmp_values(left: &i64, right: &i64) -> Ordering {
        left.cmp(right)
    }

    fn hash_value(value: &i64, hasher: &mut FxHasher) {
        hasher.write_i64(*value);
    }

    fn to_key(&self, value: &i64) -> crate::Result<CompositeKey> {
        Ok(CompositeKey::I64(*value))
    }

    fn parse_after(&self, key: &CompositeKey) -> crate::Result<i64> {
        match key {
            CompositeKey::I64(value) => Ok(*value),
            CompositeKey::U64(value) => {
                i64::try_from(*value).map_err(|_| invalid_after("an i64", key))
            }
            CompositeKey::F64(value)
                if value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value < i64::MAX as f64 =>
            {
                Ok(*value as i64)
            }
            CompositeKey::Str(date) if self.is_date => parse_date(date),
            _ => Err(invalid_after("an integer", key)),
        }
    }

    fn cmp_with_after(value: &i64, after: &i64) -> Ordering {
        value.cmp(after)
    }

    fn sorted_buckets(
        &self,
        reader: &SegmentReader,
        field: Field,
    ) -> crate::Result<Option<Vec<LeadBucket<i64>>>> {
        let Some(InvertedIndex::I64(postings)) = reader.inverted_index(field) else {
            return Ok(None);
        };
        let mut buckets: Vec<LeadBucket<i64>> = Vec::new();
        for term_idx in 0..postings.num_terms() {
            let value = self.round(postings.key(term_idx))?;
            match buckets.last_mut() {
                Some(last) if last.value == value => last.terms.end = term_idx + 1,
                _ => buckets.push(LeadBucket {
                    value,
                    terms: term_idx..term_idx + 1,
                }),
            }
        }
        Ok(Some(buckets))
    }
}

/// F64 values, or i64 and f64 values bucketed by a histogram interval.
pub(super) struct DoubleKind {
    column: Option<DynamicColumn>,
    interval: Option<f64>,
}

impl SourceKind for DoubleKind {
    type Value = f64;
    type After = f64;

    fn begin_segment(
        &mut self,
        reader: &SegmentReader,
        field: Field,
        _guard: &mut ResourceLimitGuard,
    ) -> crate::Result<()> {
        let column = reader.column(field)?;
        if !matches!(column, DynamicColumn::I64(_) | DynamicColumn::F64(_)) {
            return Err(unexpected_column(column.field_type()));
        }
        self.column = Some(column.clone());
        Ok(())
    }

    fn load_doc(&mut self, doc: DocId, values: &mut Vec<f64>) -> crate::Result<()> {
        let Some(doc_values) = self
            .column
            .as_ref()
            .and_then(|column| column.numeric_values_for_doc(doc))
        else {
            return Ok(());
        };
        for value in doc_values.filter(|value| !value.is_nan()) {
            let value = match self.interval {
                Some(interval) => (value / interval).floor() * interval,
                None => value,
            };
            // + 0.0 turns -0.0 into 0.0
            values.push(value + 0.0);
        }
        values.sort_by(f64::total_cmp);
        values.dedup_by(|left, right| left.total_cmp(right) == Ordering::Equal);
        Ok(())
    }

    fn cmp_values(left: &f64, right: &f64) -> Ordering {
        left.total_cmp(right)
    }

    fn hash_value(value: &f64, hasher: &mut FxHasher) {
        hasher.write_u64(value.to_bits());
    }

    fn to_key(&self, value: &f64) -> crate::Result<CompositeKey> {
        Ok(CompositeKey::F64(*value))
    }

    fn parse_after(&self, key: &CompositeKey) -> crate::Result<f64> {
        match key {
            CompositeKey::F64(value) => Ok(*value),
            CompositeKey::I64(value) => Ok(*value as f64),
            CompositeKey::U64(value) => Ok(*value as f64),
            _ => Err(invalid_after("a number", key)),
        }
    }

    fn cmp_with_after(value: &f64, after: &f64) -> Ordering {
        value.total_cmp(after)
    }
}

/// Geo point fields, bucketed into web mercator tiles.
pub(super) struct GeoTileKind {
    column: Option<Column<GeoPoint>>,
    precision: u8,
}

impl SourceKind for GeoTileKind {
    type Value = u64;
    type After = u64;

    fn begin_segment(
        &mut self,
        reader: &SegmentReader,
        field: Field,
        _guard: &mut ResourceLimitGuard,
    ) -> crate::Result<()> {
        self.column = match reader.column(field)? {
            DynamicColumn::GeoPoint(column) => Some(column.clone()),
            column => return Err(unexpected_column(column.field_type())),
        };
        Ok(())
    }

    fn load_doc(&mut self, doc: DocId, values: &mut Vec<u64>) -> crate::Result<()> {
        let Some(column) = &self.column else {
            return Ok(());
        };
        values.extend(
            column
                .values_for_doc(doc)
                .iter()
                .map(|point| geotile::tile_id(*point, self.precision)),
        );
        values.sort_unstable();
        values.dedup();
        Ok(())
    }

    fn cmp_values(left: &u64, right: &u64) -> Ordering {
        left.cmp(right)
    }

    fn hash_value(value: &u64, hasher: &mut FxHasher) {
        hasher.write_u64(*value);
    }

    fn to_key(&self, value: &u64) -> crate::Result<CompositeKey> {
        Ok(CompositeKey::Str(geotile::tile_to_string(*value)))
    }

    fn parse_after(&self, key: &CompositeKey) -> crate::Result<u64> {
        let CompositeKey::Str(tile) = key else {
            return Err(invalid_after("a \"zoom/x/y\" string", key));
        };
        geotile::parse_tile(tile)
    }

    fn cmp_with_after(value: &u64, after: &u64) -> Ordering {
        value.cmp(after)
    }
}

/// One dimension of the composite key.
///
/// `current` holds the value of the doc being collected, `None` standing for
/// the missing bucket. `slots[slot]` holds the value of the key in `slot`.
pub(super) struct SingleDimensionValuesSource<K: SourceKind> {
    kind: K,
    name: String,
    field: Field,
    order: Order,
    missing_bucket: bool,
    missing_order: MissingOrder,
    doc_values: Vec<K::Value>,
    current: Option<K::Value>,
    slots: Vec<Option<K::Value>>,
    /// `Some(None)` is a null after value.
    after: Option<Option<K::After>>,
    sorted_buckets: Vec<LeadBucket<K::Value>>,
    max_slots: usize,
    guard: ResourceLimitGuard,
}

impl<K: SourceKind> SingleDimensionValuesSource<K> {
    fn new(
        kind: K,
        req: &CompositeAggregationSource,
        field: Field,
        after: Option<&CompositeKey>,
        max_slots: usize,
        guard: ResourceLimitGuard,
    ) -> crate::Result<Self> {
        let after = match after {
            None => None,
            Some(CompositeKey::Null) if req.missing_bucket() => Some(None),
            Some(CompositeKey::Null) => {
                return Err(AggregationError::InvalidArgument(format!(
                    "after key of source '{}' is null but missing_bucket is disabled",
                    req.name()
                )));
            }
            Some(key) => Some(Some(kind.parse_after(key).map_err(|err| {
                AggregationError::InvalidArgument(format!(
                    "invalid after key for source '{}': {err}",
                    req.name()
                ))
            })?)),
        };
        Ok(SingleDimensionValuesSource {
            kind,
            name: req.name().to_string(),
            field,
            order: req.order(),
            missing_bucket: req.missing_bucket(),
            missing_order: req.missing_order(),
            doc_values: Vec::new(),
            current: None,
            slots: Vec::new(),
            after,
            sorted_buckets: Vec::new(),
            max_slots,
            guard,
        })
    }

    fn begin_segment(&mut self, reader: &SegmentReader) -> crate::Result<()> {
        self.sorted_buckets = Vec::new();
        self.kind.begin_segment(reader, self.field, &mut self.guard)
    }

    fn load_doc(&mut self, doc: DocId) -> crate::Result<()> {
        self.doc_values.clear();
        self.kind.load_doc(doc, &mut self.doc_values)
    }

    fn num_choices(&self) -> usize {
        if self.doc_values.is_empty() {
            usize::from(self.missing_bucket)
        } else {
            self.doc_values.len()
        }
    }

    fn set_choice(&mut self, choice: usize) {
        self.current = self.doc_values.get(choice).cloned();
    }

    /// Ordering of the missing value against any present value, direction
    /// included.
    fn missing_cmp(&self) -> Ordering {
        match self.missing_order {
            MissingOrder::First => Ordering::Less,
            MissingOrder::Last => Ordering::Greater,
            MissingOrder::Default if self.order.is_asc() => Ordering::Less,
            MissingOrder::Default => Ordering::Greater,
        }
    }

    fn cmp_options(&self, left: Option<&K::Value>, right: Option<&K::Value>) -> Ordering {
        match (left, right) {
            (Some(left), Some(right)) => self.order.apply(K::cmp_values(left, right)),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => self.missing_cmp(),
            (Some(_), None) => self.missing_cmp().reverse(),
        }
    }

    fn slot_value(&self, slot: u32) -> Option<&K::Value> {
        self.slots.get(slot as usize).and_then(Option::as_ref)
    }

    fn copy_current(&mut self, slot: u32) -> crate::Result<()> {
        let slot = slot as usize;
        if slot < self.slots.len() {
            self.slots[slot] = self.current.clone();
            Ok(())
        } else {
            push_tracked(
                &mut self.slots,
                self.current.clone(),
                self.max_slots,
                &mut self.guard,
            )
        }
    }

    fn compare_current(&self, slot: u32) -> Ordering {
        self.cmp_options(self.current.as_ref(), self.slot_value(slot))
    }

    fn compare(&self, left_slot: u32, right_slot: u32) -> Ordering {
        self.cmp_options(self.slot_value(left_slot), self.slot_value(right_slot))
    }

    fn cmp_value_with_after(&self, value: Option<&K::Value>) -> Ordering {
        match (&self.after, value) {
            (None, _) => Ordering::Greater,
            (Some(None), None) => Ordering::Equal,
            (Some(None), Some(_)) => self.missing_cmp().reverse(),
            (Some(Some(_)), None) => self.missing_cmp(),
            (Some(Some(after)), Some(value)) => self.order.apply(K::cmp_with_after(value, after)),
        }
    }

    fn compare_current_with_after(&self) -> Ordering {
        self.cmp_value_with_after(self.current.as_ref())
    }

    fn hash_current(&self, hasher: &mut FxHasher) {
        match &self.current {
            None => hasher.write_u8(0),
            Some(value) => {
                hasher.write_u8(1);
                K::hash_value(value, hasher);
            }
        }
    }

    fn key_for_slot(&self, slot: u32) -> crate::Result<CompositeKey> {
        match self.slot_value(slot) {
            Some(value) => self.kind.to_key(value),
            None => Ok(CompositeKey::Null),
        }
    }

    fn prepare_sorted_buckets(&mut self, reader: &SegmentReader) -> crate::Result<Option<usize>> {
        let Some(buckets) = self.kind.sorted_buckets(reader, self.field)? else {
            return Ok(None);
        };
        self.sorted_buckets = buckets;
        Ok(Some(self.sorted_buckets.len()))
    }

    fn bucket(&self, bucket: usize) -> crate::Result<&LeadBucket<K::Value>> {
        self.sorted_buckets.get(bucket).ok_or_else(|| {
            AggregationError::InternalError(format!("unknown sorted bucket {bucket}"))
        })
    }

    fn force_bucket(&mut self, bucket: usize) -> crate::Result<()> {
        self.current = Some(self.bucket(bucket)?.value.clone());
        Ok(())
    }

    fn compare_bucket_with_after(&self, bucket: usize) -> crate::Result<Ordering> {
        Ok(self.cmp_value_with_after(Some(&self.bucket(bucket)?.value)))
    }

    fn compare_bucket_with_slot(&self, bucket: usize, slot: u32) -> crate::Result<Ordering> {
        Ok(self.cmp_options(Some(&self.bucket(bucket)?.value), self.slot_value(slot)))
    }

    fn bucket_terms(&self, bucket: usize) -> crate::Result<Range<usize>> {
        Ok(self.bucket(bucket)?.terms.clone())
    }
}

/// The source of one dimension, whatever its kind.
pub(super) enum ValuesSource {
    Ordinal(SingleDimensionValuesSource<OrdinalKind>),
    Bytes(SingleDimensionValuesSource<BytesKind>),
    Long(SingleDimensionValuesSource<LongKind>),
    Double(SingleDimensionValuesSource<DoubleKind>),
    GeoTile(SingleDimensionValuesSource<GeoTileKind>),
}

macro_rules! dispatch {
    ($values_source:expr, $source:ident => $body:expr) => {
        match $values_source {
            ValuesSource::Ordinal($source) => $body,
            ValuesSource::Bytes($source) => $body,
            ValuesSource::Long($source) => $body,
            ValuesSource::Double($source) => $body,
            ValuesSource::GeoTile($source) => $body,
        }
    };
}

impl ValuesSource {
    /// Builds the source of `req`. `after` is the value of this source in the
    /// after key, if any.
    pub fn from_req(
        req: &CompositeAggregationSource,
        searcher: &Searcher,
        after: Option<&CompositeKey>,
        max_slots: usize,
        limits: &AggregationLimits,
    ) -> crate::Result<ValuesSource> {
        let schema = searcher.schema();
        let field = schema.get_field(req.field())?;
        let field_entry = schema.get_field_entry(field);
        if !field_entry.is_fast() {
            return Err(AggregationError::SchemaError(format!(
                "Field '{}' is not a fast field",
                req.field()
            )));
        }
        let mut guard = limits.new_guard();
        let field_type = field_entry.field_type();
        let source = match (req, field_type) {
            (CompositeAggregationSource::Terms(_), FieldType::Str) => {
                let kind = OrdinalKind::new(searcher, field, &mut guard)?;
                ValuesSource::Ordinal(SingleDimensionValuesSource::new(
                    kind, req, field, after, max_slots, guard,
                )?)
            }
            (CompositeAggregationSource::Terms(_), FieldType::Bytes) => {
                ValuesSource::Bytes(SingleDimensionValuesSource::new(
                    BytesKind::default(),
                    req,
                    field,
                    after,
                    max_slots,
                    guard,
                )?)
            }
            (CompositeAggregationSource::Terms(_), FieldType::I64 | FieldType::Date) => {
                let kind = LongKind {
                    column: None,
                    rounding: None,
                    is_date: field_type == FieldType::Date,
                };
                ValuesSource::Long(SingleDimensionValuesSource::new(
                    kind, req, field, after, max_slots, guard,
                )?)
            }
            (CompositeAggregationSource::Terms(_), FieldType::F64) => {
                let kind = DoubleKind {
                    column: None,
                    interval: None,
                };
                ValuesSource::Double(SingleDimensionValuesSource::new(
                    kind, req, field, after, max_slots, guard,
                )?)
            }
            (
                CompositeAggregationSource::Histogram(histogram),
                FieldType::I64 | FieldType::F64,
            ) => {
                if !(histogram.interval.is_finite() && histogram.interval > 0.0) {
                    return Err(AggregationError::InvalidArgument(format!(
                        "interval of histogram source '{}' must be a positive number, got {}",
                        histogram.name, histogram.interval
                    )));
                }
                let kind = DoubleKind {
                    column: None,
                    interval: Some(histogram.interval),
                };
                ValuesSource::Double(SingleDimensionValuesSource::new(
                    kind, req, field, after, max_slots, guard,
                )?)
            }
            (CompositeAggregationSource::DateHistogram(date_histogram), FieldType::Date) => {
                let kind = LongKind {
                    column: None,
                    rounding: Some(DateRounding::from_req(date_histogram)?),
                    is_date: true,
                };
                ValuesSource::Long(SingleDimensionValuesSource::new(
                    kind, req, field, after, max_slots, guard,
                )?)
            }
            (CompositeAggregationSource::GeoTileGrid(geotile_grid), FieldType::GeoPoint) => {
                if geotile_grid.precision > geotile::MAX_ZOOM {
                    return Err(AggregationError::InvalidArgument(format!(
                        "precision of geotile_grid source '{}' must be between 0 and {}, got {}",
                        geotile_grid.name,
                        geotile::MAX_ZOOM,
                        geotile_grid.precision
                    )));
                }
                let kind = GeoTileKind {
                    column: None,
                    precision: geotile_grid.precision,
                };
                ValuesSource::GeoTile(SingleDimensionValuesSource::new(
                    kind, req, field, after, max_slots, guard,
                )?)
            }
            (req, field_type) => {
                return Err(AggregationError::UnsupportedValuesSource(format!(
                    "source '{}' cannot aggregate field '{}' of type {field_type:?}",
                    req.name(),
                    req.field()
                )));
            }
        };
        Ok(source)
    }

    pub fn name(&self) -> &str {
        dispatch!(self, source => &source.name)
    }

    pub fn field(&self) -> Field {
        dispatch!(self, source => source.field)
    }

    pub fn order(&self) -> Order {
        dispatch!(self, source => source.order)
    }

    pub fn missing_bucket(&self) -> bool {
        dispatch!(self, source => source.missing_bucket)
    }

    /// Returns true if the source can walk the postings of its field.
    pub fn has_sorted_buckets(&self) -> bool {
        matches!(
            self,
            ValuesSource::Ordinal(_) | ValuesSource::Bytes(_) | ValuesSource::Long(_)
        )
    }

    pub fn begin_segment(&mut self, reader: &SegmentReader) -> crate::Result<()> {
        dispatch!(self, source => source.begin_segment(reader))
    }

    pub fn load_doc(&mut self, doc: DocId) -> crate::Result<()> {
        dispatch!(self, source => source.load_doc(doc))
    }

    /// Number of values the loaded doc offers for this dimension. The missing
    /// bucket counts as one value.
    pub fn num_choices(&self) -> usize {
        dispatch!(self, source => source.num_choices())
    }

    /// Makes the `choice`-th value of the loaded doc the current value.
    pub fn set_choice(&mut self, choice: usize) {
        dispatch!(self, source => source.set_choice(choice))
    }

    pub fn copy_current(&mut self, slot: u32) -> crate::Result<()> {
        dispatch!(self, source => source.copy_current(slot))
    }

    pub fn compare_current(&self, slot: u32) -> Ordering {
        dispatch!(self, source => source.compare_current(slot))
    }

    pub fn compare(&self, left_slot: u32, right_slot: u32) -> Ordering {
        dispatch!(self, source => source.compare(left_slot, right_slot))
    }

    pub fn compare_current_with_after(&self) -> Ordering {
        dispatch!(self, source => source.compare_current_with_after())
    }

    pub fn hash_current(&self, hasher: &mut FxHasher) {
        dispatch!(self, source => source.hash_current(hasher))
    }

    pub fn key_for_slot(&self, slot: u32) -> crate::Result<CompositeKey> {
        dispatch!(self, source => source.key_for_slot(slot))
    }

    /// Computes the sorted buckets of the segment. Returns their number, or
    /// `None` if the source cannot walk the segment in order.
    pub fn prepare_sorted_buckets(&mut self, reader: &SegmentReader) -> crate::Result<Option<usize>> {
        dispatch!(self, source => source.prepare_sorted_buckets(reader))
    }

    pub fn force_bucket(&mut self, bucket: usize) -> crate::Result<()> {
        dispatch!(self, source => source.force_bucket(bucket))
    }

    pub fn compare_bucket_with_after(&self, bucket: usize) -> crate::Result<Ordering> {
        dispatch!(self, source => source.compare_bucket_with_after(bucket))
    }

    pub fn compare_bucket_with_slot(&self, bucket: usize, slot: u32) -> crate::Result<Ordering> {
        dispatch!(self, source => source.compare_bucket_with_slot(bucket, slot))
    }

    pub fn bucket_terms(&self, bucket: usize) -> crate::Result<Range<usize>> {
        dispatch!(self, source => source.bucket_terms(bucket))
    }
}
