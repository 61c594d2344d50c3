#![allow(clippy::len_without_is_empty)]

//! # `composite-agg`
//!
//! Composite (multi-dimensional) bucket aggregations over an in-memory,
//! segmented document index.
//!
//! A composite aggregation groups the documents matching a query by a tuple
//! of values, one per source, and returns the smallest keys one page at a
//! time. Only one page of keys is kept in memory, whatever the number of
//! distinct keys.
//!
//! ```rust
//! use composite_agg::aggregation::bucket::{CompositeAggregationRequest, CompositeAggregator};
//! use composite_agg::aggregation::AggregationLimits;
//! use composite_agg::aggregation::agg_result::CompositeKey;
//! use composite_agg::query::AllQuery;
//! use composite_agg::schema::{Schema, FAST, INDEXED};
//! use composite_agg::{doc, Index};
//!
//! # fn main() -> composite_agg::Result<()> {
//! let mut schema_builder = Schema::builder();
//! let product = schema_builder.add_str_field("product", FAST | INDEXED);
//! let price = schema_builder.add_f64_field("price", FAST);
//! let index = Index::create_in_ram(schema_builder.build());
//!
//! let mut index_writer = index.writer();
//! index_writer.add_document(doc!(product => "shoes", price => 25.0f64))?;
//! index_writer.add_document(doc!(product => "hat", price => 12.0f64))?;
//! index_writer.add_document(doc!(product => "shoes", price => 31.0f64))?;
//! index_writer.commit()?;
//!
//! let request: CompositeAggregationRequest = serde_json::from_str(
//!     r#"{
//!         "composite": {
//!             "sources": [{"product": {"terms": {"field": "product"}}}],
//!             "size": 1
//!         },
//!         "aggs": {"max_price": {"max": {"field": "price"}}}
//!     }"#,
//! )
//! .unwrap();
//! let searcher = index.searcher();
//! let limits = AggregationLimits::default();
//!
//! let collector = CompositeAggregator::new(&request, &searcher, &AllQuery, &limits)?;
//! let first_page = searcher.search(&AllQuery, collector)?;
//! assert_eq!(first_page.buckets[0].key["product"], CompositeKey::from("hat"));
//!
//! // The last key of a page is the `after` key of the next one.
//! let mut next_request = request.clone();
//! next_request.composite.after = first_page.after_key.unwrap();
//! let collector = CompositeAggregator::new(&next_request, &searcher, &AllQuery, &limits)?;
//! let second_page = searcher.search(&AllQuery, collector)?;
//! assert_eq!(second_page.buckets[0].key["product"], CompositeKey::from("shoes"));
//! assert_eq!(second_page.buckets[0].doc_count, 2);
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;

mod error;

pub mod aggregation;
pub mod collector;
pub mod column;
pub mod docset;
pub mod index;
pub mod postings;
pub mod query;
pub mod schema;

pub use common::ByteCount;

pub use crate::docset::{DocSet, TERMINATED};
pub use crate::error::{AggregationError, Result};
pub use crate::index::{
    Index, IndexBuilder, IndexSettings, IndexSortByField, IndexWriter, Order, Searcher,
    SegmentReader,
};

/// A u32 identifying a document within a segment.
/// Documents have their `DocId` assigned incrementally,
/// as they are added in the segment.
///
/// At most, a segment can contain 2^31 documents.
pub type DocId = u32;

/// A f32 that represents the relevance of the document to the query
///
/// This is modelled internally as a `f32`. The larger the number, the more relevant
/// the document to the search query.
pub type Score = f32;

/// A `SegmentOrdinal` identifies a segment, within a `Searcher`.
pub type SegmentOrdinal = u32;
