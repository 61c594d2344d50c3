use crate::docset::{DocSet, TERMINATED};
use crate::query::{Query, Scorer, Weight};
use crate::{DocId, Score, Searcher, SegmentReader};

/// Query that matches all of the documents.
///
/// All of the document get the score 1.0.
#[derive(Clone, Debug)]
pub struct AllQuery;

impl Query for AllQuery {
    fn weight(&self, _: &Searcher, _: bool) -> crate::Result<Box<dyn Weight>> {
        Ok(Box::new(AllWeight))
    }

    fn is_match_all(&self) -> bool {
        true
    }
}

/// Weight associated to the `AllQuery` query.
pub struct AllWeight;

impl Weight for AllWeight {
    fn scorer(&self, reader: &SegmentReader) -> crate::Result<Box<dyn Scorer>> {
        Ok(Box::new(AllScorer::new(reader.max_doc())))
    }
}

/// Scorer associated to the `AllQuery` query.
pub struct AllScorer {
    doc: DocId,
    max_doc: DocId,
}

impl AllScorer {
    /// Scorer over `0..max_doc`.
    pub fn new(max_doc: DocId) -> AllScorer {
        let doc = if max_doc == 0 { TERMINATED } else { 0 };
        AllScorer { doc, max_doc }
    }
}

impl DocSet for AllScorer {
    fn advance(&mut self) -> DocId {
        if self.doc == TERMINATED || self.doc + 1 >= self.max_doc {
            self.doc = TERMINATED;
            return TERMINATED;
        }
        self.doc += 1;
        self.doc
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if self.doc == TERMINATED || target <= self.doc {
            return self.doc;
        }
        self.doc = if target >= self.max_doc {
            TERMINATED
        } else {
            target
        };
        self.doc
    }

    fn doc(&self) -> DocId {
        self.doc
    }

    fn size_hint(&self) -> u32 {
        self.max_doc
    }
}

impl Scorer for AllScorer {
    fn score(&mut self) -> Score {
        1.0
    }
}
