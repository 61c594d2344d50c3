//! Contains the final aggregation result types.
//!
//! They serialize to the same JSON shape as Elasticsearch's composite
//! aggregation response.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::metric::{SingleMetricResult, Stats};

/// Value of one dimension of a composite key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompositeKey {
    /// Boolean key
    Bool(bool),
    /// String key. Byte-string keys are base64 encoded, geo tiles are
    /// formatted as `"zoom/x/y"`.
    Str(String),
    /// `i64` key, also used for dates (milliseconds since the epoch).
    I64(i64),
    /// `u64` key
    U64(u64),
    /// `f64` key
    F64(f64),
    /// Null key, for documents without a value when `missing_bucket` is set.
    Null,
}

impl From<&str> for CompositeKey {
    fn from(text: &str) -> Self {
        CompositeKey::Str(text.to_string())
    }
}

impl From<String> for CompositeKey {
    fn from(text: String) -> Self {
        CompositeKey::Str(text)
    }
}

impl From<i64> for CompositeKey {
    fn from(val: i64) -> Self {
        CompositeKey::I64(val)
    }
}

impl From<f64> for CompositeKey {
    fn from(val: f64) -> Self {
        CompositeKey::F64(val)
    }
}

/// Metric result of a sub-aggregation, for one bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricResult {
    /// Average metric result.
    Average(SingleMetricResult),
    /// Count metric result.
    Count(SingleMetricResult),
    /// Max metric result.
    Max(SingleMetricResult),
    /// Min metric result.
    Min(SingleMetricResult),
    /// Stats metric result.
    Stats(Stats),
    /// Sum metric result.
    Sum(SingleMetricResult),
}

impl MetricResult {
    /// Returns the value of a single value metric, or of a `stats` property.
    pub fn get_value(&self, agg_property: &str) -> crate::Result<Option<f64>> {
        match self {
            MetricResult::Average(single)
            | MetricResult::Count(single)
            | MetricResult::Max(single)
            | MetricResult::Min(single)
            | MetricResult::Sum(single) => Ok(single.value),
            MetricResult::Stats(stats) => stats.get_value(agg_property),
        }
    }
}

/// One bucket of a composite aggregation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeBucket {
    /// The composite key, source name to value.
    pub key: FxHashMap<String, CompositeKey>,
    /// Number of documents matching the key.
    pub doc_count: u64,
    /// Results of the sub-aggregations, by name.
    #[serde(flatten)]
    pub sub_aggregation: FxHashMap<String, MetricResult>,
}

/// Result of a composite aggregation: one page of buckets, in key order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeAggregationResult {
    /// The buckets, sorted by key.
    pub buckets: Vec<CompositeBucket>,
    /// The key of the last bucket. Pass it as `after` to fetch the next page.
    ///
    /// Absent if there are no buckets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_key: Option<FxHashMap<String, CompositeKey>>,
}

impl CompositeAggregationResult {
    /// Returns true if the page has no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
