#![allow(dead_code)]

use composite_agg::aggregation::AggregationLimits;
use composite_agg::aggregation::agg_result::{
    CompositeAggregationResult, CompositeBucket, CompositeKey,
};
use composite_agg::aggregation::bucket::{CompositeAggregationRequest, CompositeAggregator};
use composite_agg::query::Query;
use composite_agg::schema::{DateTime, Document, FAST, INDEXED, Schema};
use composite_agg::{Index, IndexSettings, IndexSortByField, Order, Searcher};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn request(value: serde_json::Value) -> CompositeAggregationRequest {
    serde_json::from_value(value).unwrap()
}

/// Runs `req` on `query`, with the sorted docs walk switched on or off.
pub fn run_with_options(
    searcher: &Searcher,
    query: &dyn Query,
    req: &CompositeAggregationRequest,
    limits: &AggregationLimits,
    sorted_docs: bool,
) -> composite_agg::Result<CompositeAggregationResult> {
    init_logger();
    let mut collector = CompositeAggregator::new(req, searcher, query, limits)?;
    collector.set_sorted_docs_optimization(sorted_docs);
    searcher.search(query, collector)
}

pub fn run(
    searcher: &Searcher,
    query: &dyn Query,
    req: &CompositeAggregationRequest,
) -> composite_agg::Result<CompositeAggregationResult> {
    run_with_options(searcher, query, req, &AggregationLimits::default(), true)
}

/// Follows the `after_key` cursor until an empty page comes back.
pub fn fetch_all_pages(
    searcher: &Searcher,
    query: &dyn Query,
    req: &CompositeAggregationRequest,
    sorted_docs: bool,
) -> composite_agg::Result<Vec<CompositeBucket>> {
    let limits = AggregationLimits::default();
    let mut req = req.clone();
    let mut buckets = Vec::new();
    loop {
        let page = run_with_options(searcher, query, &req, &limits, sorted_docs)?;
        let Some(after_key) = page.after_key else {
            assert!(page.buckets.is_empty());
            break;
        };
        assert!(page.buckets.len() <= req.composite.size as usize);
        buckets.extend(page.buckets);
        req.composite.after = after_key;
    }
    assert_eq!(limits.memory_consumed(), 0u64);
    Ok(buckets)
}

pub fn keys(result: &CompositeAggregationResult, name: &str) -> Vec<CompositeKey> {
    result
        .buckets
        .iter()
        .map(|bucket| bucket.key[name].clone())
        .collect()
}

pub fn doc_counts(result: &CompositeAggregationResult) -> Vec<u64> {
    result.buckets.iter().map(|bucket| bucket.doc_count).collect()
}

pub fn metric_value(bucket: &CompositeBucket, name: &str) -> Option<f64> {
    bucket.sub_aggregation[name].get_value("").unwrap()
}

/// A generated document: any number of colors, an optional size, an
/// optional creation date (in milliseconds) and a price.
#[derive(Clone, Debug)]
pub struct Row {
    pub colors: Vec<String>,
    pub size: Option<i64>,
    pub created: Option<i64>,
    pub price: i64,
}

/// Indexes `rows` with `color` (str), `size` (i64), `created` (date) and
/// `price` (f64) fields.
///
/// A new segment is started every `docs_per_segment` rows.
pub fn index_from_rows(
    rows: &[Row],
    docs_per_segment: usize,
    sort_by_size: Option<Order>,
) -> composite_agg::Result<Index> {
    let mut schema_builder = Schema::builder();
    let color = schema_builder.add_str_field("color", FAST | INDEXED);
    let size = schema_builder.add_i64_field("size", FAST | INDEXED);
    let created = schema_builder.add_date_field("created", FAST | INDEXED);
    let price = schema_builder.add_f64_field("price", FAST);
    let settings = IndexSettings {
        sort_by_field: sort_by_size.map(|order| IndexSortByField {
            field: "size".to_string(),
            order,
        }),
    };
    let index = Index::builder()
        .schema(schema_builder.build())
        .settings(settings)
        .create_in_ram()?;
    let mut index_writer = index.writer();
    for chunk in rows.chunks(docs_per_segment.max(1)) {
        for row in chunk {
            let mut doc = Document::default();
            for color_val in &row.colors {
                doc.add_value(color, color_val.as_str());
            }
            if let Some(size_val) = row.size {
                doc.add_value(size, size_val);
            }
            if let Some(created_ms) = row.created {
                doc.add_value(created, DateTime::from_timestamp_millis(created_ms));
            }
            doc.add_value(price, row.price as f64);
            index_writer.add_document(doc)?;
        }
        index_writer.commit()?;
    }
    Ok(index)
}
