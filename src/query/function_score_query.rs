use std::fmt;
use std::sync::Arc;

use crate::query::{Query, Scorer, Weight};
use crate::{DocId, DocSet, Score, Searcher, SegmentReader};

/// Computes the score of a doc out of the score given by the wrapped query.
pub type ScoreFunction = Arc<dyn Fn(&SegmentReader, Score, DocId) -> Score + Send + Sync + 'static>;

/// A FunctionScoreQuery modifies the score of
/// matched documents using a custom function.
///
/// ```rust
/// use std::sync::Arc;
/// use composite_agg::query::{AllQuery, FunctionScoreQuery};
/// use composite_agg::{DocId, Score, SegmentReader};
///
/// let query = FunctionScoreQuery::new(
///     Box::new(AllQuery),
///     Arc::new(|_: &SegmentReader, score: Score, doc: DocId| score * 2.0 + doc as f32),
/// );
/// ```
pub struct FunctionScoreQuery {
    query: Box<dyn Query>,
    function: ScoreFunction,
}

impl FunctionScoreQuery {
    /// Creates a new FunctionScoreQuery.
    pub fn new(query: Box<dyn Query>, function: ScoreFunction) -> Self {
        FunctionScoreQuery { query, function }
    }
}

impl Clone for FunctionScoreQuery {
    fn clone(&self) -> Self {
        FunctionScoreQuery {
            query: self.query.box_clone(),
            function: self.function.clone(),
        }
    }
}

impl fmt::Debug for FunctionScoreQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FunctionScore(query={:?})", self.query)
    }
}

impl Query for FunctionScoreQuery {
    fn weight(&self, searcher: &Searcher, scoring_enabled: bool) -> crate::Result<Box<dyn Weight>> {
        let inner_weight = self.query.weight(searcher, scoring_enabled)?;
        Ok(Box::new(FunctionScoreWeight {
            weight: inner_weight,
            scoring_enabled,
            function: self.function.clone(),
        }))
    }

    fn is_match_all(&self) -> bool {
        self.query.is_match_all()
    }
}

struct FunctionScoreWeight {
    weight: Box<dyn Weight>,
    scoring_enabled: bool,
    function: ScoreFunction,
}

impl Weight for FunctionScoreWeight {
    fn scorer(&self, reader: &SegmentReader) -> crate::Result<Box<dyn Scorer>> {
        let inner_scorer = self.weight.scorer(reader)?;
        if !self.scoring_enabled {
            return Ok(inner_scorer);
        }
        Ok(Box::new(FunctionScorer {
            scorer: inner_scorer,
            segment_reader: reader.clone(),
            function: self.function.clone(),
        }))
    }
}

struct FunctionScorer {
    scorer: Box<dyn Scorer>,
    segment_reader: SegmentReader,
    function: ScoreFunction,
}

impl DocSet for FunctionScorer {
    fn advance(&mut self) -> DocId {
        self.scorer.advance()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        self.scorer.seek(target)
    }

    fn doc(&self) -> DocId {
        self.scorer.doc()
    }

    fn size_hint(&self) -> u32 {
        self.scorer.size_hint()
    }
}

impl Scorer for FunctionScorer {
    fn score(&mut self) -> Score {
        let score = self.scorer.score();
        let doc_id = self.doc();
        (self.function)(&self.segment_reader, score, doc_id)
    }
}
