//! Definition of the crate's error and result.

use common::ByteCount;
use thiserror::Error;

use crate::aggregation::bucket::DateHistogramParseError;

/// The library's error enum.
///
/// Every variant aborts the aggregation it was raised from. There is no
/// partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    /// The requested page size exceeds the configured bucket ceiling.
    #[error("Too many buckets requested: {requested}, the configured limit is {limit}")]
    TooManyBuckets {
        /// The bucket ceiling.
        limit: u32,
        /// The requested number of buckets.
        requested: u32,
    },
    /// The memory budget shared by the request was exceeded.
    #[error("Aborting aggregation because memory limit was exceeded. Limit: {limit}, Current: {current}")]
    MemoryExceeded {
        /// Memory consumption limit
        limit: ByteCount,
        /// Current memory consumption
        current: ByteCount,
    },
    /// The field or source kind cannot be aggregated by a composite source.
    #[error("Unsupported values source: {0}")]
    UnsupportedValuesSource(String),
    /// A replayed doc could not be matched with the scorer of its segment.
    #[error("Deferred replay went out of sync: {0}")]
    ReplayInconsistency(String),
    /// Invalid argument was passed by the user.
    #[error("An invalid argument was passed: '{0}'")]
    InvalidArgument(String),
    /// An Error appeared related to the schema.
    #[error("Schema error: '{0}'")]
    SchemaError(String),
    /// Internal invariant violated.
    #[error("Internal error: '{0}'")]
    InternalError(String),
    /// Failed to parse a date histogram interval.
    #[error("Date histogram parse error: {0:?}")]
    DateHistogramParseError(#[from] DateHistogramParseError),
}

/// `Result` alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AggregationError>;
