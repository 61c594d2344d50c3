/*!
Queries define the set of documents pushed to a collector, and their scores.

A [`Query`] is turned into a [`Weight`] for a given searcher, which in turn
creates one [`Scorer`] per segment.
*/

mod all_query;
mod function_score_query;
#[allow(clippy::module_inception)]
mod query;
mod range_query;
mod scorer;
mod term_query;
mod weight;

pub use self::all_query::{AllQuery, AllScorer, AllWeight};
pub use self::function_score_query::{FunctionScoreQuery, ScoreFunction};
pub use self::query::{Query, QueryClone};
pub use self::range_query::RangeQuery;
pub use self::scorer::{EmptyScorer, Scorer};
pub use self::term_query::TermQuery;
pub use self::weight::Weight;
