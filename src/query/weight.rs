use super::Scorer;
use crate::SegmentReader;

/// A Weight is the specialization of a Query
/// for a given set of segments.
///
/// See [`Query`](super::Query).
pub trait Weight: Send + Sync + 'static {
    /// Returns the scorer for the given segment.
    fn scorer(&self, reader: &SegmentReader) -> crate::Result<Box<dyn Scorer>>;
}
