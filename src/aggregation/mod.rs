//! # Aggregations
//!
//! An aggregation summarizes your data as statistics on buckets or metrics.
//!
//! The composite aggregation groups the matching documents by a tuple of
//! values, one per source, and returns the buckets one page at a time, sorted
//! by key. It can answer questions like:
//! - How many errors with status code 500 do we have per host and per day?
//! - What is the average listing price of cars grouped by brand and color?
//!
//! Metrics can be nested in the buckets, see [metric].
//!
//! ## Prerequisite
//! Aggregations work only on fast fields. Fast fields of type `i64`, `f64`,
//! `date`, `bytes`, `str` and geo points can be used as sources.
//!
//! ## Usage
//! Build a [`CompositeAggregationRequest`](bucket::CompositeAggregationRequest),
//! then a [`CompositeAggregator`](bucket::CompositeAggregator) from it.
//! `CompositeAggregator` implements the [`Collector`](crate::collector::Collector)
//! trait and can be passed as collector into
//! [`Searcher::search()`](crate::Searcher::search).
//!
//! ## JSON Format
//! Requests and results de/serialize into elasticsearch compatible JSON.
//!
//! ```
//! use composite_agg::aggregation::bucket::CompositeAggregationRequest;
//!
//! let elasticsearch_compatible_json_req = r#"
//! {
//!   "composite": {
//!     "sources": [
//!       { "brand": { "terms": { "field": "brand" } } },
//!       { "price": { "histogram": { "field": "price", "interval": 1000 } } }
//!     ],
//!     "size": 20
//!   },
//!   "aggs": {
//!     "avg_mileage": { "avg": { "field": "mileage" } }
//!   }
//! }"#;
//! let request: CompositeAggregationRequest =
//!     serde_json::from_str(elasticsearch_compatible_json_req).unwrap();
//! assert_eq!(request.composite.sources.len(), 2);
//! ```
//!
//! ## Memory
//! Every aggregation request shares one [`AggregationLimits`]. Its memory
//! limit caps the bytes held by the key queue, the value sources, the docs
//! recorded for nested metrics and the metrics themselves. Its bucket limit
//! caps the page size.

mod agg_limits;
pub mod agg_result;
pub mod bucket;
mod date;
pub mod metric;
mod sub_aggregation;

pub use agg_limits::{AggregationLimits, MemoryConsumption, ResourceLimitGuard};
pub use sub_aggregation::BucketCollector;

/// The default max bucket count, before the aggregation fails.
pub const DEFAULT_BUCKET_LIMIT: u32 = 65000;

/// The default memory limit in bytes before the aggregation fails. 500MB
pub const DEFAULT_MEMORY_LIMIT: u64 = 500_000_000;
