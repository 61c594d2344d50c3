use std::fmt;

use super::Weight;
use crate::Searcher;
use crate::docset::{DocSet, TERMINATED};

/// The `Query` trait defines a set of documents and a scoring method
/// for those documents.
///
/// Because our index is actually split into segments, the
/// query does not actually directly creates [`DocSet`] object.
/// Instead, the query creates a [`Weight`] object for a given searcher.
///
/// The weight object, in turn, makes it possible to create
/// a scorer for a specific [`SegmentReader`](crate::SegmentReader).
///
/// So to sum it up :
/// - a `Query` is a recipe to define a set of documents as well the way to score them.
/// - a [`Weight`] is this recipe tied to a specific [`Searcher`].
/// - a [`Scorer`](super::Scorer) is a cursor over the set of matching documents, for a
///   specific segment. It is created by the [`Weight`].
pub trait Query: QueryClone + Send + Sync + fmt::Debug {
    /// Create the weight associated with a query.
    ///
    /// If scoring is not required, setting `scoring_enabled` to `false`
    /// can increase performances.
    fn weight(&self, searcher: &Searcher, scoring_enabled: bool) -> crate::Result<Box<dyn Weight>>;

    /// Returns true if the query matches every document of the index.
    ///
    /// Collectors may then walk the index structures directly instead of
    /// iterating over the matching docs.
    fn is_match_all(&self) -> bool {
        false
    }

    /// Returns the number of documents matching the query.
    fn count(&self, searcher: &Searcher) -> crate::Result<usize> {
        let weight = self.weight(searcher, false)?;
        let mut result = 0;
        for reader in searcher.segment_readers() {
            let mut scorer = weight.scorer(reader)?;
            let mut doc = scorer.doc();
            while doc != TERMINATED {
                result += 1;
                doc = scorer.advance();
            }
        }
        Ok(result)
    }
}

/// Implements `box_clone`.
pub trait QueryClone {
    /// Returns a boxed clone of `self`.
    fn box_clone(&self) -> Box<dyn Query>;
}

impl<T> QueryClone for T
where T: 'static + Query + Clone
{
    fn box_clone(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}

impl Query for Box<dyn Query> {
    fn weight(&self, searcher: &Searcher, scoring_enabled: bool) -> crate::Result<Box<dyn Weight>> {
        self.as_ref().weight(searcher, scoring_enabled)
    }

    fn is_match_all(&self) -> bool {
        self.as_ref().is_match_all()
    }

    fn count(&self, searcher: &Searcher) -> crate::Result<usize> {
        self.as_ref().count(searcher)
    }
}

impl QueryClone for Box<dyn Query> {
    fn box_clone(&self) -> Box<dyn Query> {
        self.as_ref().box_clone()
    }
}
