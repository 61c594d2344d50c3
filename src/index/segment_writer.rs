use std::cmp::Ordering;

use itertools::Itertools;
use log::info;
use rustc_hash::FxHashMap;

use crate::column::{BytesColumn, Column, Dictionary, DynamicColumn};
use crate::index::{IndexSettings, IndexSortByField, SegmentReader};
use crate::postings::{InvertedIndex, Postings};
use crate::schema::{Document, Field, FieldEntry, FieldType, GeoPoint, Schema, Value};
use crate::{AggregationError, DocId, SegmentOrdinal};

/// Buffers documents until they get sealed into a segment.
pub(crate) struct SegmentWriter {
    schema: Schema,
    docs: Vec<Document>,
}

impl SegmentWriter {
    pub fn new(schema: Schema) -> SegmentWriter {
        SegmentWriter {
            schema,
            docs: Vec::new(),
        }
    }

    pub fn add_document(&mut self, doc: Document) -> crate::Result<()> {
        self.schema.validate_document(&doc)?;
        self.docs.push(doc);
        Ok(())
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    /// Seals the buffered documents into a segment.
    ///
    /// If the index is sorted, documents are reordered by the first value of
    /// the sort field. Documents without a value come last, whatever the
    /// order.
    pub fn finalize(
        self,
        segment_ord: SegmentOrdinal,
        settings: &IndexSettings,
    ) -> crate::Result<SegmentReader> {
        let doc_order = match &settings.sort_by_field {
            Some(sort_by_field) => sorted_doc_order(&self.schema, &self.docs, sort_by_field)?,
            None => (0..self.docs.len()).collect(),
        };
        let docs: Vec<&Document> = doc_order.iter().map(|&doc_id| &self.docs[doc_id]).collect();
        let mut columns = FxHashMap::default();
        let mut inverted_indexes = FxHashMap::default();
        for (field, field_entry) in self.schema.fields() {
            build_field(
                field,
                field_entry,
                &docs,
                &mut columns,
                &mut inverted_indexes,
            );
        }
        info!(
            "sealed segment {segment_ord} with {} docs ({} columns, {} inverted indexes)",
            docs.len(),
            columns.len(),
            inverted_indexes.len()
        );
        Ok(SegmentReader::new(
            segment_ord,
            docs.len() as DocId,
            self.schema,
            columns,
            inverted_indexes,
        ))
    }
}

/// Value a doc gets sorted by.
enum SortKey<'a> {
    Bytes(&'a [u8]),
    I64(i64),
    F64(f64),
}

impl SortKey<'_> {
    fn cmp_key(&self, other: &SortKey<'_>) -> Ordering {
        match (self, other) {
            (SortKey::Bytes(left), SortKey::Bytes(right)) => left.cmp(right),
            (SortKey::I64(left), SortKey::I64(right)) => left.cmp(right),
            (SortKey::F64(left), SortKey::F64(right)) => left.total_cmp(right),
            _ => Ordering::Equal,
        }
    }
}

pub(crate) fn validate_sort_by_field(
    schema: &Schema,
    sort_by_field: &IndexSortByField,
) -> crate::Result<Field> {
    let field = schema.get_field(&sort_by_field.field).map_err(|_| {
        AggregationError::InvalidArgument(format!(
            "Unknown index sort field '{}'",
            sort_by_field.field
        ))
    })?;
    let field_entry = schema.get_field_entry(field);
    if !field_entry.is_fast() {
        return Err(AggregationError::InvalidArgument(format!(
            "Only fast fields can be used to sort the index, '{}' is not a fast field",
            sort_by_field.field
        )));
    }
    if field_entry.field_type() == FieldType::GeoPoint {
        return Err(AggregationError::InvalidArgument(format!(
            "Geo point field '{}' cannot be used to sort the index",
            sort_by_field.field
        )));
    }
    Ok(field)
}

fn sorted_doc_order(
    schema: &Schema,
    docs: &[Document],
    sort_by_field: &IndexSortByField,
) -> crate::Result<Vec<usize>> {
    let field = validate_sort_by_field(schema, sort_by_field)?;
    let keys: Vec<Option<SortKey>> = docs.iter().map(|doc| sort_key(doc, field)).collect();
    let order = sort_by_field.order;
    let mut doc_order: Vec<usize> = (0..docs.len()).collect();
    doc_order.sort_by(|&left, &right| match (&keys[left], &keys[right]) {
        (Some(left_key), Some(right_key)) => order.apply(left_key.cmp_key(right_key)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(doc_order)
}

fn sort_key(doc: &Document, field: Field) -> Option<SortKey<'_>> {
    doc.get_all(field)
        .filter_map(|value| match value {
            Value::Str(text) => Some(SortKey::Bytes(text.as_bytes())),
            Value::Bytes(bytes) => Some(SortKey::Bytes(bytes)),
            Value::I64(val) => Some(SortKey::I64(*val)),
            Value::Date(date) => Some(SortKey::I64(date.into_timestamp_millis())),
            Value::F64(val) => Some(SortKey::F64(*val)),
            Value::GeoPoint(_) => None,
        })
        .min_by(|left, right| left.cmp_key(right))
}

fn build_field(
    field: Field,
    field_entry: &FieldEntry,
    docs: &[&Document],
    columns: &mut FxHashMap<Field, DynamicColumn>,
    inverted_indexes: &mut FxHashMap<Field, InvertedIndex>,
) {
    match field_entry.field_type() {
        FieldType::Str | FieldType::Bytes => {
            let doc_terms: Vec<Vec<&[u8]>> = docs
                .iter()
                .map(|doc| {
                    doc.get_all(field)
                        .filter_map(|value| match value {
                            Value::Str(text) => Some(text.as_bytes()),
                            Value::Bytes(bytes) => Some(bytes.as_slice()),
                            _ => None,
                        })
                        .sorted()
                        .dedup()
                        .collect()
                })
                .collect();
            let terms: Vec<Vec<u8>> = doc_terms
                .iter()
                .flatten()
                .copied()
                .sorted()
                .dedup()
                .map(<[u8]>::to_vec)
                .collect();
            let dictionary = Dictionary::from_sorted_terms(terms);
            let doc_ords: Vec<Vec<u64>> = doc_terms
                .iter()
                .map(|terms| {
                    terms
                        .iter()
                        .filter_map(|term| dictionary.term_ord(term).ok())
                        .collect()
                })
                .collect();
            if field_entry.is_indexed() {
                let postings = build_postings(&doc_ords);
                inverted_indexes.insert(
                    field,
                    InvertedIndex::Terms {
                        dictionary: dictionary.clone(),
                        postings,
                    },
                );
            }
            if field_entry.is_fast() {
                let bytes_column = BytesColumn {
                    dictionary,
                    term_ord_column: Column::from_doc_values(doc_ords),
                };
                let column = if field_entry.field_type() == FieldType::Str {
                    DynamicColumn::Str(bytes_column.into())
                } else {
                    DynamicColumn::Bytes(bytes_column)
                };
                columns.insert(field, column);
            }
        }
        FieldType::I64 | FieldType::Date => {
            let doc_vals: Vec<Vec<i64>> = docs
                .iter()
                .map(|doc| {
                    doc.get_all(field)
                        .filter_map(|value| match value {
                            Value::I64(val) => Some(*val),
                            Value::Date(date) => Some(date.into_timestamp_millis()),
                            _ => None,
                        })
                        .sorted()
                        .dedup()
                        .collect()
                })
                .collect();
            if field_entry.is_indexed() {
                inverted_indexes.insert(field, InvertedIndex::I64(build_postings(&doc_vals)));
            }
            if field_entry.is_fast() {
                let column = Column::from_doc_values(doc_vals);
                let column = if field_entry.field_type() == FieldType::Date {
                    DynamicColumn::Date(column)
                } else {
                    DynamicColumn::I64(column)
                };
                columns.insert(field, column);
            }
        }
        FieldType::F64 => {
            if field_entry.is_fast() {
                let doc_vals: Vec<Vec<f64>> = docs
                    .iter()
                    .map(|doc| {
                        let mut vals: Vec<f64> = doc
                            .get_all(field)
                            .filter_map(|value| match value {
                                Value::F64(val) => Some(*val),
                                _ => None,
                            })
                            .collect();
                        vals.sort_by(f64::total_cmp);
                        vals.dedup();
                        vals
                    })
                    .collect();
                columns.insert(field, DynamicColumn::F64(Column::from_doc_values(doc_vals)));
            }
        }
        FieldType::GeoPoint => {
            if field_entry.is_fast() {
                let doc_vals: Vec<Vec<GeoPoint>> = docs
                    .iter()
                    .map(|doc| {
                        doc.get_all(field)
                            .filter_map(|value| match value {
                                Value::GeoPoint(point) => Some(*point),
                                _ => None,
                            })
                            .collect()
                    })
                    .collect();
                columns.insert(
                    field,
                    DynamicColumn::GeoPoint(Column::from_doc_values(doc_vals)),
                );
            }
        }
    }
}

fn build_postings<K: Copy + Ord>(doc_vals: &[Vec<K>]) -> Postings<K> {
    let mut entries: Vec<(K, DocId)> = doc_vals
        .iter()
        .enumerate()
        .flat_map(|(doc, vals)| vals.iter().map(move |val| (*val, doc as DocId)))
        .collect();
    entries.sort_unstable();
    let entries: Vec<(K, Vec<DocId>)> = entries
        .into_iter()
        .chunk_by(|(key, _)| *key)
        .into_iter()
        .map(|(key, group)| (key, group.map(|(_, doc)| doc).collect()))
        .collect();
    Postings::from_sorted_entries(entries)
}
