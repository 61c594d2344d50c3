mod common;

use std::sync::Arc;

use composite_agg::aggregation::AggregationLimits;
use composite_agg::aggregation::agg_result::CompositeKey;
use composite_agg::aggregation::bucket::CompositeAggregator;
use composite_agg::query::{AllQuery, FunctionScoreQuery, RangeQuery, TermQuery};
use composite_agg::schema::{DateTime, FAST, GeoPoint, INDEXED, Schema};
use composite_agg::{AggregationError, DocId, Index, Score, SegmentReader, doc};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::common::{
    Row, doc_counts, fetch_all_pages, index_from_rows, keys, metric_value, request, run,
    run_with_options,
};

fn terms_index(values: &[&str]) -> composite_agg::Result<Index> {
    let mut schema_builder = Schema::builder();
    let term = schema_builder.add_str_field("term", FAST | INDEXED);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    for value in values {
        index_writer.add_document(doc!(term => *value))?;
    }
    index_writer.commit()?;
    Ok(index)
}

#[test]
fn test_single_string_dimension() -> composite_agg::Result<()> {
    let index = terms_index(&["a", "b", "a"])?;
    let req = request(json!({
        "composite": {"sources": [{"term": {"terms": {"field": "term"}}}], "size": 10}
    }));
    let result = run(&index.searcher(), &AllQuery, &req)?;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "buckets": [
                {"key": {"term": "a"}, "doc_count": 2},
                {"key": {"term": "b"}, "doc_count": 1}
            ],
            "after_key": {"term": "b"}
        })
    );
    Ok(())
}

#[test]
fn test_pagination_with_after_key() -> composite_agg::Result<()> {
    let index = terms_index(&["b", "a"])?;
    let searcher = index.searcher();
    let mut req = request(json!({
        "composite": {"sources": [{"term": {"terms": {"field": "term"}}}], "size": 1}
    }));

    let first_page = run(&searcher, &AllQuery, &req)?;
    assert_eq!(keys(&first_page, "term"), vec![CompositeKey::from("a")]);
    assert_eq!(doc_counts(&first_page), vec![1]);
    let after_key = first_page.after_key.unwrap();
    assert_eq!(after_key["term"], CompositeKey::from("a"));

    req.composite.after = after_key;
    let second_page = run(&searcher, &AllQuery, &req)?;
    assert_eq!(keys(&second_page, "term"), vec![CompositeKey::from("b")]);
    assert_eq!(doc_counts(&second_page), vec![1]);
    let after_key = second_page.after_key.unwrap();
    assert_eq!(after_key["term"], CompositeKey::from("b"));

    req.composite.after = after_key;
    let last_page = run(&searcher, &AllQuery, &req)?;
    assert!(last_page.is_empty());
    assert_eq!(last_page.after_key, None);
    Ok(())
}

#[test]
fn test_mixed_directions() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let term = schema_builder.add_str_field("term", FAST | INDEXED);
    let value = schema_builder.add_i64_field("value", FAST);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(term => "x", value => 1i64))?;
    index_writer.add_document(doc!(term => "x", value => 2i64))?;
    index_writer.add_document(doc!(term => "y", value => 1i64))?;
    index_writer.commit()?;

    let req = request(json!({
        "composite": {"sources": [
            {"term": {"terms": {"field": "term"}}},
            {"value": {"terms": {"field": "value", "order": "desc"}}}
        ]}
    }));
    let searcher = index.searcher();
    for sorted_docs in [true, false] {
        let result = run_with_options(
            &searcher,
            &AllQuery,
            &req,
            &AggregationLimits::default(),
            sorted_docs,
        )?;
        let pairs: Vec<(CompositeKey, CompositeKey)> = result
            .buckets
            .iter()
            .map(|bucket| (bucket.key["term"].clone(), bucket.key["value"].clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (CompositeKey::from("x"), CompositeKey::I64(2)),
                (CompositeKey::from("x"), CompositeKey::I64(1)),
                (CompositeKey::from("y"), CompositeKey::I64(1)),
            ]
        );
    }
    Ok(())
}

#[test]
fn test_too_many_buckets() -> composite_agg::Result<()> {
    let index = terms_index(&["a"])?;
    let req = request(json!({
        "composite": {"sources": [{"term": {"terms": {"field": "term"}}}], "size": 100_000}
    }));
    let limits = AggregationLimits::new(None, Some(10_000));
    let err = CompositeAggregator::new(&req, &index.searcher(), &AllQuery, &limits).err();
    assert_eq!(
        err,
        Some(AggregationError::TooManyBuckets {
            limit: 10_000,
            requested: 100_000,
        })
    );
    assert_eq!(limits.memory_consumed(), 0u64);
    Ok(())
}

#[test]
fn test_zero_size_returns_empty_page() -> composite_agg::Result<()> {
    let index = terms_index(&["a", "b"])?;
    let req = request(json!({
        "composite": {"sources": [{"term": {"terms": {"field": "term"}}}], "size": 0}
    }));
    let result = run(&index.searcher(), &AllQuery, &req)?;
    assert!(result.is_empty());
    assert_eq!(result.after_key, None);
    Ok(())
}

#[test]
fn test_empty_index() -> composite_agg::Result<()> {
    let index = terms_index(&[])?;
    let req = request(json!({
        "composite": {"sources": [{"term": {"terms": {"field": "term"}}}]},
        "aggs": {"count": {"value_count": {"field": "_score"}}}
    }));
    let result = run(&index.searcher(), &AllQuery, &req)?;
    assert!(result.is_empty());
    assert_eq!(result.after_key, None);
    Ok(())
}

fn colors_index() -> composite_agg::Result<Index> {
    let mut schema_builder = Schema::builder();
    let color = schema_builder.add_str_field("color", FAST | INDEXED);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(color => "red"))?;
    index_writer.add_document(doc!())?;
    index_writer.add_document(doc!(color => "blue"))?;
    index_writer.add_document(doc!())?;
    index_writer.commit()?;
    Ok(index)
}

#[test]
fn test_missing_bucket_ordering() -> composite_agg::Result<()> {
    let index = colors_index()?;
    let searcher = index.searcher();
    let null = CompositeKey::Null;
    let red = CompositeKey::from("red");
    let blue = CompositeKey::from("blue");
    let cases = [
        (json!({"field": "color"}), vec![blue.clone(), red.clone()]),
        (
            json!({"field": "color", "missing_bucket": true}),
            vec![null.clone(), blue.clone(), red.clone()],
        ),
        (
            json!({"field": "color", "missing_bucket": true, "missing_order": "last"}),
            vec![blue.clone(), red.clone(), null.clone()],
        ),
        (
            json!({"field": "color", "missing_bucket": true, "order": "desc"}),
            vec![red.clone(), blue.clone(), null.clone()],
        ),
        (
            json!({"field": "color", "missing_bucket": true, "order": "desc", "missing_order": "first"}),
            vec![null.clone(), red.clone(), blue.clone()],
        ),
    ];
    for (source, expected) in cases {
        let req = request(json!({
            "composite": {"sources": [{"color": {"terms": source}}]}
        }));
        let result = run(&searcher, &AllQuery, &req)?;
        assert_eq!(keys(&result, "color"), expected);
        let null_count = result
            .buckets
            .iter()
            .find(|bucket| bucket.key["color"] == CompositeKey::Null)
            .map(|bucket| bucket.doc_count);
        if expected.contains(&CompositeKey::Null) {
            assert_eq!(null_count, Some(2));
        } else {
            assert_eq!(null_count, None);
        }
    }
    Ok(())
}

#[test]
fn test_missing_bucket_pagination() -> composite_agg::Result<()> {
    let index = colors_index()?;
    let searcher = index.searcher();
    let mut req = request(json!({
        "composite": {
            "sources": [{"color": {"terms": {"field": "color", "missing_bucket": true}}}],
            "size": 1
        }
    }));
    let first_page = run(&searcher, &AllQuery, &req)?;
    assert_eq!(keys(&first_page, "color"), vec![CompositeKey::Null]);
    req.composite.after = first_page.after_key.unwrap();
    let second_page = run(&searcher, &AllQuery, &req)?;
    assert_eq!(keys(&second_page, "color"), vec![CompositeKey::from("blue")]);
    Ok(())
}

#[test]
fn test_null_after_key_needs_missing_bucket() -> composite_agg::Result<()> {
    let index = colors_index()?;
    let req = request(json!({
        "composite": {
            "sources": [{"color": {"terms": {"field": "color"}}}],
            "after": {"color": null}
        }
    }));
    let limits = AggregationLimits::default();
    assert!(matches!(
        CompositeAggregator::new(&req, &index.searcher(), &AllQuery, &limits),
        Err(AggregationError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_invalid_requests() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let name = schema_builder.add_str_field("name", FAST);
    let location = schema_builder.add_geo_point_field("location", FAST);
    let indexed_only = schema_builder.add_i64_field("indexed_only", INDEXED);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(
        name => "a",
        location => GeoPoint::new(1.0, 2.0),
        indexed_only => 3i64
    ))?;
    index_writer.commit()?;
    let searcher = index.searcher();
    let limits = AggregationLimits::default();
    let build = |value: serde_json::Value| {
        CompositeAggregator::new(&request(value), &searcher, &AllQuery, &limits).err()
    };

    let err = build(json!({"composite": {"sources": [{"tile": {"geotile_grid": {"field": "name"}}}]}}));
    assert!(matches!(err, Some(AggregationError::UnsupportedValuesSource(_))));
    let err = build(json!({"composite": {"sources": [{"loc": {"terms": {"field": "location"}}}]}}));
    assert!(matches!(err, Some(AggregationError::UnsupportedValuesSource(_))));
    let err = build(json!({"composite": {"sources": [{"x": {"terms": {"field": "unknown"}}}]}}));
    assert!(matches!(err, Some(AggregationError::SchemaError(_))));
    let err = build(json!({"composite": {"sources": [{"x": {"terms": {"field": "indexed_only"}}}]}}));
    assert!(matches!(err, Some(AggregationError::SchemaError(_))));
    let err = build(json!({"composite": {"sources": []}}));
    assert!(matches!(err, Some(AggregationError::InvalidArgument(_))));
    let err = build(json!({"composite": {"sources": [
        {"x": {"terms": {"field": "name"}}},
        {"x": {"terms": {"field": "name"}}}
    ]}}));
    assert!(matches!(err, Some(AggregationError::InvalidArgument(_))));
    let err = build(json!({"composite": {
        "sources": [{"x": {"terms": {"field": "name"}}}, {"y": {"terms": {"field": "name"}}}],
        "after": {"x": "a"}
    }}));
    assert!(matches!(err, Some(AggregationError::InvalidArgument(_))));
    let err = build(json!({"composite": {
        "sources": [{"x": {"histogram": {"field": "name", "interval": 10}}}]
    }}));
    assert!(matches!(err, Some(AggregationError::UnsupportedValuesSource(_))));
    assert_eq!(limits.memory_consumed(), 0u64);
    Ok(())
}

#[test]
fn test_histogram_source() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let price = schema_builder.add_f64_field("price", FAST);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    for val in [1.0f64, 4.9, 5.0, 12.0, -0.5] {
        index_writer.add_document(doc!(price => val))?;
    }
    index_writer.commit()?;
    let req = request(json!({
        "composite": {"sources": [{"price": {"histogram": {"field": "price", "interval": 5}}}]}
    }));
    let result = run(&index.searcher(), &AllQuery, &req)?;
    assert_eq!(
        keys(&result, "price"),
        vec![
            CompositeKey::F64(-5.0),
            CompositeKey::F64(0.0),
            CompositeKey::F64(5.0),
            CompositeKey::F64(10.0),
        ]
    );
    assert_eq!(doc_counts(&result), vec![1, 2, 1, 1]);
    Ok(())
}

#[test]
fn test_date_histogram_source() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let date = schema_builder.add_date_field("date", FAST | INDEXED);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    // 2024-01-01T10:00:00Z, 2024-01-01T20:00:00Z, 2024-01-02T05:00:00Z
    for secs in [1_704_103_200i64, 1_704_139_200, 1_704_171_600] {
        index_writer.add_document(doc!(date => DateTime::from_timestamp_secs(secs)))?;
    }
    index_writer.commit()?;
    let searcher = index.searcher();

    let req = request(json!({
        "composite": {"sources": [{"day": {"date_histogram": {"field": "date", "calendar_interval": "day"}}}]}
    }));
    let result = run(&searcher, &AllQuery, &req)?;
    assert_eq!(
        keys(&result, "day"),
        vec![
            CompositeKey::I64(1_704_067_200_000),
            CompositeKey::I64(1_704_153_600_000)
        ]
    );
    assert_eq!(doc_counts(&result), vec![2, 1]);

    let req = request(json!({
        "composite": {
            "sources": [{"half_day": {"date_histogram": {"field": "date", "fixed_interval": "12h"}}}],
            "after": {"half_day": "2024-01-01T00:00:00Z"}
        }
    }));
    let result = run(&searcher, &AllQuery, &req)?;
    assert_eq!(
        keys(&result, "half_day"),
        vec![
            CompositeKey::I64(1_704_110_400_000),
            CompositeKey::I64(1_704_153_600_000)
        ]
    );
    assert_eq!(doc_counts(&result), vec![1, 1]);
    Ok(())
}

#[test]
fn test_date_histogram_bucket_out_of_range() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let date = schema_builder.add_date_field("date", FAST | INDEXED);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(date => DateTime::from_timestamp_millis(i64::MIN)))?;
    index_writer.commit()?;
    let searcher = index.searcher();
    let req = request(json!({
        "composite": {"sources": [{"sec": {"date_histogram": {"field": "date", "fixed_interval": "1s"}}}]}
    }));
    for sorted_docs in [true, false] {
        let limits = AggregationLimits::default();
        let result = run_with_options(&searcher, &AllQuery, &req, &limits, sorted_docs);
        assert!(matches!(result, Err(AggregationError::InvalidArgument(_))));
        assert_eq!(limits.memory_consumed(), 0u64);
    }
    Ok(())
}

#[test]
fn test_geotile_source() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let location = schema_builder.add_geo_point_field("location", FAST);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(location => GeoPoint::new(-10.0, 10.0)))?;
    index_writer.add_document(doc!(location => GeoPoint::new(45.0, -90.0)))?;
    index_writer.add_document(doc!(location => GeoPoint::new(-20.0, 20.0)))?;
    index_writer.commit()?;
    let req = request(json!({
        "composite": {"sources": [{"tile": {"geotile_grid": {"field": "location", "precision": 1}}}]}
    }));
    let result = run(&index.searcher(), &AllQuery, &req)?;
    assert_eq!(
        keys(&result, "tile"),
        vec![CompositeKey::from("1/0/0"), CompositeKey::from("1/1/1")]
    );
    assert_eq!(doc_counts(&result), vec![1, 2]);
    Ok(())
}

#[test]
fn test_bytes_source() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let hash = schema_builder.add_bytes_field("hash", FAST | INDEXED);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(hash => vec![1u8, 2]))?;
    index_writer.add_document(doc!(hash => vec![0u8]))?;
    index_writer.add_document(doc!(hash => vec![1u8, 2]))?;
    index_writer.commit()?;
    let searcher = index.searcher();
    let mut req = request(json!({
        "composite": {"sources": [{"hash": {"terms": {"field": "hash"}}}]}
    }));
    let result = run(&searcher, &AllQuery, &req)?;
    assert_eq!(
        keys(&result, "hash"),
        vec![CompositeKey::from("AA=="), CompositeKey::from("AQI=")]
    );
    assert_eq!(doc_counts(&result), vec![1, 2]);

    req.composite.after = result.after_key.unwrap();
    let next = run(&searcher, &AllQuery, &req)?;
    assert!(next.is_empty());
    Ok(())
}

#[test]
fn test_multi_valued_docs_count_once_per_key() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let tag = schema_builder.add_str_field("tag", FAST | INDEXED);
    let num = schema_builder.add_i64_field("num", FAST);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(tag => "a", tag => "b", tag => "a", num => 1i64, num => 2i64))?;
    index_writer.add_document(doc!(tag => "b", num => 2i64))?;
    index_writer.commit()?;
    let req = request(json!({
        "composite": {"sources": [
            {"tag": {"terms": {"field": "tag"}}},
            {"num": {"terms": {"field": "num"}}}
        ]}
    }));
    let result = run(&index.searcher(), &AllQuery, &req)?;
    let pairs: Vec<(CompositeKey, CompositeKey, u64)> = result
        .buckets
        .iter()
        .map(|bucket| {
            (
                bucket.key["tag"].clone(),
                bucket.key["num"].clone(),
                bucket.doc_count,
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            (CompositeKey::from("a"), CompositeKey::I64(1), 1),
            (CompositeKey::from("a"), CompositeKey::I64(2), 1),
            (CompositeKey::from("b"), CompositeKey::I64(1), 1),
            (CompositeKey::from("b"), CompositeKey::I64(2), 2),
        ]
    );
    Ok(())
}

#[test]
fn test_multiple_segments() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let color = schema_builder.add_str_field("color", FAST | INDEXED);
    let price = schema_builder.add_i64_field("price", FAST | INDEXED);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(color => "red", price => 10i64))?;
    index_writer.add_document(doc!(color => "green", price => 3i64))?;
    index_writer.commit()?;
    index_writer.add_document(doc!(color => "blue", price => 7i64))?;
    index_writer.add_document(doc!(color => "red", price => 1i64))?;
    index_writer.commit()?;
    index_writer.add_document(doc!(color => "amber", price => 2i64))?;
    index_writer.commit()?;
    let searcher = index.searcher();
    assert_eq!(searcher.segment_readers().len(), 3);

    let req = request(json!({
        "composite": {
            "sources": [{"color": {"terms": {"field": "color"}}}],
            "size": 3
        },
        "aggs": {"max_price": {"max": {"field": "price"}}}
    }));
    for sorted_docs in [true, false] {
        let result = run_with_options(
            &searcher,
            &AllQuery,
            &req,
            &AggregationLimits::default(),
            sorted_docs,
        )?;
        assert_eq!(
            keys(&result, "color"),
            vec![
                CompositeKey::from("amber"),
                CompositeKey::from("blue"),
                CompositeKey::from("green")
            ]
        );
        let maxes: Vec<Option<f64>> = result
            .buckets
            .iter()
            .map(|bucket| metric_value(bucket, "max_price"))
            .collect();
        assert_eq!(maxes, vec![Some(2.0), Some(7.0), Some(3.0)]);
    }

    let price_field = searcher.schema().get_field("price")?;
    let cheap = RangeQuery::new_i64(price_field, ..5);
    let result = run(&searcher, &cheap, &req)?;
    assert_eq!(
        keys(&result, "color"),
        vec![
            CompositeKey::from("amber"),
            CompositeKey::from("green"),
            CompositeKey::from("red")
        ]
    );
    assert_eq!(metric_value(&result.buckets[2], "max_price"), Some(1.0));
    Ok(())
}

#[test]
fn test_sub_aggregations_on_filtered_query() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let brand = schema_builder.add_str_field("brand", FAST | INDEXED);
    let color = schema_builder.add_str_field("color", FAST | INDEXED);
    let mileage = schema_builder.add_i64_field("mileage", FAST);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    index_writer.add_document(doc!(brand => "audi", color => "red", mileage => 1000i64))?;
    index_writer.add_document(doc!(brand => "bmw", color => "red", mileage => 3000i64))?;
    index_writer.add_document(doc!(brand => "audi", color => "blue", mileage => 5000i64))?;
    index_writer.add_document(doc!(brand => "audi", color => "red", mileage => 2000i64))?;
    index_writer.add_document(doc!(brand => "audi", color => "red"))?;
    index_writer.commit()?;
    let searcher = index.searcher();
    let red = TermQuery::new(searcher.schema().get_field("color")?, "red");
    let req = request(json!({
        "composite": {"sources": [{"brand": {"terms": {"field": "brand"}}}]},
        "aggs": {
            "avg_mileage": {"avg": {"field": "mileage"}},
            "mileage_stats": {"stats": {"field": "mileage"}},
            "cars": {"value_count": {"field": "mileage"}}
        }
    }));
    let result = run(&searcher, &red, &req)?;
    assert_eq!(
        serde_json::to_value(&result.buckets).unwrap(),
        json!([
            {
                "key": {"brand": "audi"},
                "doc_count": 3,
                "avg_mileage": {"value": 1500.0},
                "mileage_stats": {"count": 2, "sum": 3000.0, "min": 1000.0, "max": 2000.0, "avg": 1500.0},
                "cars": {"value": 2.0}
            },
            {
                "key": {"brand": "bmw"},
                "doc_count": 1,
                "avg_mileage": {"value": 3000.0},
                "mileage_stats": {"count": 1, "sum": 3000.0, "min": 3000.0, "max": 3000.0, "avg": 3000.0},
                "cars": {"value": 1.0}
            }
        ])
    );
    Ok(())
}

#[test]
fn test_score_sub_aggregation() -> composite_agg::Result<()> {
    let index = terms_index(&["a", "b", "a", "b", "a"])?;
    let searcher = index.searcher();
    let query = FunctionScoreQuery::new(
        Box::new(AllQuery),
        Arc::new(|_: &SegmentReader, _: Score, doc: DocId| doc as f32),
    );
    let req = request(json!({
        "composite": {"sources": [{"term": {"terms": {"field": "term"}}}]},
        "aggs": {"score_sum": {"sum": {"field": "_score"}}}
    }));
    for sorted_docs in [true, false] {
        let result = run_with_options(
            &searcher,
            &query,
            &req,
            &AggregationLimits::default(),
            sorted_docs,
        )?;
        assert_eq!(keys(&result, "term"), vec![CompositeKey::from("a"), CompositeKey::from("b")]);
        // docs 0, 2, 4 and 1, 3
        assert_eq!(metric_value(&result.buckets[0], "score_sum"), Some(6.0));
        assert_eq!(metric_value(&result.buckets[1], "score_sum"), Some(4.0));
    }
    Ok(())
}

#[test]
fn test_memory_limit_is_enforced_and_released() -> composite_agg::Result<()> {
    let mut schema_builder = Schema::builder();
    let num = schema_builder.add_i64_field("num", FAST);
    let index = Index::create_in_ram(schema_builder.build());
    let mut index_writer = index.writer();
    for val in 0..5_000i64 {
        index_writer.add_document(doc!(num => val))?;
    }
    index_writer.commit()?;
    let searcher = index.searcher();
    let req = request(json!({
        "composite": {"sources": [{"num": {"terms": {"field": "num"}}}], "size": 1000},
        "aggs": {"total": {"sum": {"field": "num"}}}
    }));
    let limits = AggregationLimits::new(Some(1_000), None);
    let result = CompositeAggregator::new(&req, &searcher, &AllQuery, &limits)
        .and_then(|collector| searcher.search(&AllQuery, collector));
    assert!(matches!(result, Err(AggregationError::MemoryExceeded { .. })));
    assert_eq!(limits.memory_consumed(), 0u64);

    let limits = AggregationLimits::default();
    let result = run_with_options(&searcher, &AllQuery, &req, &limits, true)?;
    assert_eq!(result.buckets.len(), 1000);
    assert_eq!(limits.memory_consumed(), 0u64);
    Ok(())
}

#[test]
fn test_random_corpus_pages_cover_every_doc() -> composite_agg::Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let rows: Vec<Row> = (0..3_000)
        .map(|_| Row {
            colors: vec![format!("color{:02}", rng.gen_range(0..20))],
            size: rng.gen_bool(0.9).then(|| rng.gen_range(-50i64..50)),
            created: None,
            price: rng.gen_range(0..1_000),
        })
        .collect();
    let index = index_from_rows(&rows, 700, None)?;
    let searcher = index.searcher();
    let req = request(json!({
        "composite": {
            "sources": [
                {"color": {"terms": {"field": "color"}}},
                {"size": {"histogram": {"field": "size", "interval": 10, "order": "desc"}}}
            ],
            "size": 7
        },
        "aggs": {"price_sum": {"sum": {"field": "price"}}}
    }));
    let walked = fetch_all_pages(&searcher, &AllQuery, &req, true)?;
    let scanned = fetch_all_pages(&searcher, &AllQuery, &req, false)?;
    assert_eq!(walked, scanned);

    let num_docs_with_size = rows.iter().filter(|row| row.size.is_some()).count() as u64;
    let total_doc_count: u64 = walked.iter().map(|bucket| bucket.doc_count).sum();
    assert_eq!(total_doc_count, num_docs_with_size);
    let expected_price_sum: i64 = rows
        .iter()
        .filter(|row| row.size.is_some())
        .map(|row| row.price)
        .sum();
    let price_sum: f64 = walked
        .iter()
        .filter_map(|bucket| metric_value(bucket, "price_sum"))
        .sum();
    assert_eq!(price_sum, expected_price_sum as f64);
    // 20 colors times 10 histogram buckets
    assert_eq!(walked.len(), 200);
    Ok(())
}
