use crate::docset::{DocSet, TERMINATED};
use crate::{DocId, Score};

/// Scored set of documents matching a query within a specific segment.
///
/// See [`Query`](super::Query).
pub trait Scorer: DocSet + 'static {
    /// Returns the score.
    ///
    /// This method will perform a bit of computation and is not cached.
    fn score(&mut self) -> Score;
}

impl Scorer for Box<dyn Scorer> {
    #[inline]
    fn score(&mut self) -> Score {
        self.as_mut().score()
    }
}

/// Scorer that matches no document.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyScorer;

impl DocSet for EmptyScorer {
    fn advance(&mut self) -> DocId {
        TERMINATED
    }

    fn doc(&self) -> DocId {
        TERMINATED
    }

    fn size_hint(&self) -> u32 {
        0
    }
}

impl Scorer for EmptyScorer {
    fn score(&mut self) -> Score {
        0.0
    }
}
