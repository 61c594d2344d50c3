use crate::docset::{DocSet, VecDocSet};
use crate::postings::InvertedIndex;
use crate::query::{EmptyScorer, Query, Scorer, Weight};
use crate::schema::{Field, FieldType};
use crate::{AggregationError, DocId, Score, Searcher, SegmentReader};

/// Matches the documents containing a given term of an indexed str or bytes
/// field.
///
/// Every match gets the score 1.0.
#[derive(Clone, Debug)]
pub struct TermQuery {
    field: Field,
    term: Vec<u8>,
}

impl TermQuery {
    /// Creates a new term query.
    pub fn new(field: Field, term: impl Into<Vec<u8>>) -> TermQuery {
        TermQuery {
            field,
            term: term.into(),
        }
    }
}

impl Query for TermQuery {
    fn weight(&self, searcher: &Searcher, _scoring_enabled: bool) -> crate::Result<Box<dyn Weight>> {
        let field_entry = searcher.schema().get_field_entry(self.field);
        if !field_entry.is_indexed() {
            return Err(AggregationError::SchemaError(format!(
                "Field '{}' is not indexed",
                field_entry.name()
            )));
        }
        if !matches!(field_entry.field_type(), FieldType::Str | FieldType::Bytes) {
            return Err(AggregationError::SchemaError(format!(
                "Term queries only apply to str and bytes fields, '{}' is {:?}",
                field_entry.name(),
                field_entry.field_type()
            )));
        }
        Ok(Box::new(TermWeight {
            field: self.field,
            term: self.term.clone(),
        }))
    }
}

struct TermWeight {
    field: Field,
    term: Vec<u8>,
}

impl Weight for TermWeight {
    fn scorer(&self, reader: &SegmentReader) -> crate::Result<Box<dyn Scorer>> {
        let Some(InvertedIndex::Terms {
            dictionary,
            postings,
        }) = reader.inverted_index(self.field)
        else {
            return Ok(Box::new(EmptyScorer));
        };
        let term_idx = dictionary
            .term_ord(&self.term)
            .ok()
            .and_then(|term_ord| postings.term_idx(term_ord));
        match term_idx {
            Some(term_idx) => Ok(Box::new(TermScorer {
                docset: postings.docset(term_idx),
            })),
            None => Ok(Box::new(EmptyScorer)),
        }
    }
}

struct TermScorer {
    docset: VecDocSet,
}

impl DocSet for TermScorer {
    fn advance(&mut self) -> DocId {
        self.docset.advance()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        self.docset.seek(target)
    }

    fn doc(&self) -> DocId {
        self.docset.doc()
    }

    fn size_hint(&self) -> u32 {
        self.docset.size_hint()
    }
}

impl Scorer for TermScorer {
    fn score(&mut self) -> Score {
        1.0
    }
}
