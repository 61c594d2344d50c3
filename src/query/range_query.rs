use std::ops::{Bound, RangeBounds};

use crate::column::{Column, DynamicColumn};
use crate::docset::{DocSet, TERMINATED};
use crate::query::{Query, Scorer, Weight};
use crate::schema::{DateTime, Field};
use crate::{AggregationError, DocId, Score, Searcher, SegmentReader};

/// Matches the documents having at least one value of an i64 or date fast
/// field within a range.
///
/// Every match gets the score 1.0.
///
/// ```rust
/// use composite_agg::query::{Query, RangeQuery};
/// use composite_agg::schema::{Schema, FAST};
/// use composite_agg::{doc, Index};
///
/// # fn main() -> composite_agg::Result<()> {
/// let mut schema_builder = Schema::builder();
/// let year = schema_builder.add_i64_field("year", FAST);
/// let index = Index::create_in_ram(schema_builder.build());
/// let mut index_writer = index.writer();
/// for y in 1990i64..2010 {
///     index_writer.add_document(doc!(year => y))?;
/// }
/// index_writer.commit()?;
/// let searcher = index.searcher();
/// let query = RangeQuery::new_i64(year, 1995..2000);
/// assert_eq!(query.count(&searcher)?, 5);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RangeQuery {
    field: Field,
    lower: Bound<i64>,
    upper: Bound<i64>,
}

impl RangeQuery {
    /// Range over an i64 field.
    pub fn new_i64<R: RangeBounds<i64>>(field: Field, range: R) -> RangeQuery {
        RangeQuery {
            field,
            lower: range.start_bound().cloned(),
            upper: range.end_bound().cloned(),
        }
    }

    /// Range over a date field.
    pub fn new_date<R: RangeBounds<DateTime>>(field: Field, range: R) -> RangeQuery {
        let to_millis = |bound: Bound<&DateTime>| bound.map(|date| date.into_timestamp_millis());
        RangeQuery {
            field,
            lower: to_millis(range.start_bound()),
            upper: to_millis(range.end_bound()),
        }
    }
}

impl Query for RangeQuery {
    fn weight(&self, searcher: &Searcher, _scoring_enabled: bool) -> crate::Result<Box<dyn Weight>> {
        let field_entry = searcher.schema().get_field_entry(self.field);
        if !field_entry.is_fast() {
            return Err(AggregationError::SchemaError(format!(
                "Range queries require a fast field, '{}' is not one",
                field_entry.name()
            )));
        }
        Ok(Box::new(RangeWeight {
            field: self.field,
            lower: self.lower,
            upper: self.upper,
        }))
    }
}

struct RangeWeight {
    field: Field,
    lower: Bound<i64>,
    upper: Bound<i64>,
}

impl Weight for RangeWeight {
    fn scorer(&self, reader: &SegmentReader) -> crate::Result<Box<dyn Scorer>> {
        let column = match reader.column(self.field)? {
            DynamicColumn::I64(column) | DynamicColumn::Date(column) => column.clone(),
            other => {
                return Err(AggregationError::InvalidArgument(format!(
                    "Range queries only apply to i64 and date fields, got {:?}",
                    other.field_type()
                )));
            }
        };
        let mut scorer = RangeScorer {
            column,
            lower: self.lower,
            upper: self.upper,
            doc: 0,
            max_doc: reader.max_doc(),
        };
        scorer.doc = scorer.next_match(0);
        Ok(Box::new(scorer))
    }
}

struct RangeScorer {
    column: Column<i64>,
    lower: Bound<i64>,
    upper: Bound<i64>,
    doc: DocId,
    max_doc: DocId,
}

impl RangeScorer {
    fn matches(&self, doc: DocId) -> bool {
        let range = (self.lower, self.upper);
        self.column
            .values_for_doc(doc)
            .iter()
            .any(|val| range.contains(val))
    }

    /// First matching doc greater or equal to `from`.
    fn next_match(&self, from: DocId) -> DocId {
        (from..self.max_doc)
            .find(|&doc| self.matches(doc))
            .unwrap_or(TERMINATED)
    }
}

impl DocSet for RangeScorer {
    fn advance(&mut self) -> DocId {
        if self.doc != TERMINATED {
            self.doc = self.next_match(self.doc + 1);
        }
        self.doc
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if self.doc != TERMINATED && self.doc < target {
            self.doc = self.next_match(target);
        }
        self.doc
    }

    fn doc(&self) -> DocId {
        self.doc
    }

    fn size_hint(&self) -> u32 {
        self.max_doc
    }
}

impl Scorer for RangeScorer {
    fn score(&mut self) -> Score {
        1.0
    }
}
