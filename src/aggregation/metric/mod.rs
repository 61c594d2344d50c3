//! Module for the metric aggregations that can be nested in a composite
//! aggregation.
//!
//! The aggregations in this family compute metrics based on values extracted
//! from the documents of each bucket. Values are read from the numeric fast field of the
//! document, or are the document score if the field is `"_score"`.
//! Some aggregations output a single numeric metric (e.g. Average) and are called
//! single-value numeric metrics aggregation, others generate multiple metrics (e.g. Stats) and are
//! called multi-value numeric metrics aggregation.
//!
//! ## Supported Metric Aggregations
//! - `avg`
//! - `min`
//! - `max`
//! - `sum`
//! - `value_count`
//! - `stats`

mod stats;

use serde::{Deserialize, Serialize};
pub use stats::*;

/// Field name standing for the document score.
pub const SCORE_FIELD: &str = "_score";

/// Field a metric aggregation reads its values from.
///
/// # JSON Format
/// ```json
/// {
///     "avg": {
///         "field": "price"
///     }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricFieldRequest {
    /// The numeric fast field, or `"_score"`.
    pub field: String,
}

impl MetricFieldRequest {
    /// Creates a new request from a field name.
    pub fn from_field_name(field_name: impl Into<String>) -> Self {
        MetricFieldRequest {
            field: field_name.into(),
        }
    }
}

/// A metric aggregation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricAggregation {
    /// Average of the values.
    #[serde(rename = "avg")]
    Average(MetricFieldRequest),
    /// Smallest value.
    Min(MetricFieldRequest),
    /// Largest value.
    Max(MetricFieldRequest),
    /// Sum of the values.
    Sum(MetricFieldRequest),
    /// Number of values.
    #[serde(rename = "value_count")]
    Count(MetricFieldRequest),
    /// Count, sum, min, max and average of the values.
    Stats(MetricFieldRequest),
}

impl MetricAggregation {
    /// Returns the field the metric is computed on.
    pub fn field_name(&self) -> &str {
        match self {
            MetricAggregation::Average(req)
            | MetricAggregation::Min(req)
            | MetricAggregation::Max(req)
            | MetricAggregation::Sum(req)
            | MetricAggregation::Count(req)
            | MetricAggregation::Stats(req) => &req.field,
        }
    }

    pub(crate) fn stats_type(&self) -> StatsType {
        match self {
            MetricAggregation::Average(_) => StatsType::Average,
            MetricAggregation::Min(_) => StatsType::Min,
            MetricAggregation::Max(_) => StatsType::Max,
            MetricAggregation::Sum(_) => StatsType::Sum,
            MetricAggregation::Count(_) => StatsType::Count,
            MetricAggregation::Stats(_) => StatsType::Stats,
        }
    }
}

/// Single-metric aggregations use this common result structure.
///
/// Main reason to wrap it in value is to match elasticsearch output structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SingleMetricResult {
    /// The value of the single value metric.
    pub value: Option<f64>,
}

impl From<f64> for SingleMetricResult {
    fn from(value: f64) -> Self {
        Self { value: Some(value) }
    }
}

impl From<Option<f64>> for SingleMetricResult {
    fn from(value: Option<f64>) -> Self {
        Self { value }
    }
}
