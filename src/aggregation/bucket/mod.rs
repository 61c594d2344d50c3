//! Module for the bucket aggregations.
//!
//! Bucket aggregations group documents into buckets, and may run nested
//! aggregations on the documents of each bucket.
//!
//! ## Supported Bucket Aggregations
//! - [Composite](CompositeAggregation)

mod composite;

pub use composite::*;
