//! Composite aggregation: paginated buckets over several dimensions.
//!
//! Every source turns the documents into one value per dimension. The
//! buckets are the distinct combinations of values, sorted dimension by
//! dimension. Only one page of buckets, the `size` smallest keys after the
//! `after` cursor, is kept in memory while scanning.

mod aggregator;
mod calendar_interval;
mod geotile;
mod interval;
mod queue;
mod sorted_docs;
mod values_source;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use self::aggregator::CompositeAggregator;
pub use self::interval::DateHistogramParseError;
use crate::AggregationError;
use crate::aggregation::agg_result::CompositeKey;
use crate::aggregation::metric::MetricAggregation;
use crate::index::Order;

/// Position of missing keys in the ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingOrder {
    /// Missing keys appear first in ascending order, last in descending order.
    #[default]
    Default,
    /// Missing keys should appear first.
    First,
    /// Missing keys should appear last.
    Last,
}

fn agg_source_default_order() -> Order {
    Order::Asc
}

fn default_geotile_precision() -> u8 {
    7
}

fn default_size() -> u32 {
    10
}

/// Term source for a composite aggregation.
///
/// Works on str, bytes, i64, f64 and date fields. Keys of bytes fields are
/// base64 encoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermCompositeAggregationSource {
    /// The name used to refer to this source in the composite key.
    #[serde(skip)]
    pub name: String,
    /// The field to aggregate on.
    pub field: String,
    /// The order for this source.
    #[serde(default = "agg_source_default_order")]
    pub order: Order,
    /// Whether to create a `null` bucket for documents without value for this
    /// field. By default documents without a value are ignored.
    #[serde(default)]
    pub missing_bucket: bool,
    /// Whether missing keys should appear first or last.
    #[serde(default)]
    pub missing_order: MissingOrder,
}

/// Histogram source for a composite aggregation.
///
/// Values are rounded down to a multiple of `interval`. Keys are `f64`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramCompositeAggregationSource {
    /// The name used to refer to this source in the composite key.
    #[serde(skip)]
    pub name: String,
    /// The field to aggregate on. Either an i64 or an f64 field.
    pub field: String,
    /// The interval for the histogram. Must be strictly positive.
    pub interval: f64,
    /// The order for this source.
    #[serde(default = "agg_source_default_order")]
    pub order: Order,
    /// Whether to create a `null` bucket for documents without value for this
    /// field. By default documents without a value are ignored.
    #[serde(default)]
    pub missing_bucket: bool,
    /// Whether missing keys should appear first or last.
    #[serde(default)]
    pub missing_order: MissingOrder,
}

/// Calendar intervals supported for date histogram sources
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarInterval {
    /// A year between Jan 1st and Dec 31st, taking into account leap years.
    Year,
    /// Three months, starting in January, April, July or October.
    Quarter,
    /// A month between the 1st and the last day of the month.
    Month,
    /// A week between Monday and Sunday.
    Week,
    /// A day, starting at midnight.
    Day,
    /// An hour.
    Hour,
    /// A minute.
    Minute,
}

/// Date histogram source for a composite aggregation.
///
/// Time zone not supported yet. Every interval is aligned on UTC, then
/// shifted by `offset`. Keys are milliseconds since the epoch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateHistogramCompositeAggregationSource {
    /// The name used to refer to this source in the composite key.
    #[serde(skip)]
    pub name: String,
    /// The field to aggregate on.
    pub field: String,
    /// The fixed interval for the histogram, e.g. `"30m"`. Either this or
    /// `calendar_interval` must be set.
    ///
    /// The accepted units for fixed intervals are:
    /// * `ms`: milliseconds
    /// * `s`: seconds. Defined as 1000 milliseconds each.
    /// * `m`: minutes. Defined as 60 seconds each (60_000 milliseconds).
    /// * `h`: hours. Defined as 60 minutes each (3_600_000 milliseconds).
    /// * `d`: days. Defined as 24 hours (86_400_000 milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_interval: Option<String>,
    /// The calendar adjusted interval for the histogram. Either this or
    /// `fixed_interval` must be set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_interval: Option<CalendarInterval>,
    /// Shifts the buckets, e.g. `"+6h"` or `"-1d"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    /// The order for this source.
    #[serde(default = "agg_source_default_order")]
    pub order: Order,
    /// Whether to create a `null` bucket for documents without value for this
    /// field. By default documents without a value are ignored.
    #[serde(default)]
    pub missing_bucket: bool,
    /// Whether missing keys should appear first or last.
    #[serde(default)]
    pub missing_order: MissingOrder,
}

/// Geo tile grid source for a composite aggregation.
///
/// Points are bucketed into the web mercator tile containing them, at the
/// given zoom level. Keys are formatted as `"zoom/x/y"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTileGridCompositeAggregationSource {
    /// The name used to refer to this source in the composite key.
    #[serde(skip)]
    pub name: String,
    /// The geo point field to aggregate on.
    pub field: String,
    /// Zoom level, between 0 and 29.
    #[serde(default = "default_geotile_precision")]
    pub precision: u8,
    /// The order for this source.
    #[serde(default = "agg_source_default_order")]
    pub order: Order,
    /// Whether to create a `null` bucket for documents without value for this
    /// field. By default documents without a value are ignored.
    #[serde(default)]
    pub missing_bucket: bool,
    /// Whether missing keys should appear first or last.
    #[serde(default)]
    pub missing_order: MissingOrder,
}

/// Source for the composite aggregation. A composite aggregation can have
/// multiple sources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeAggregationSource {
    /// Terms source.
    Terms(TermCompositeAggregationSource),
    /// Histogram source.
    Histogram(HistogramCompositeAggregationSource),
    /// Date histogram source.
    DateHistogram(DateHistogramCompositeAggregationSource),
    /// Geo tile grid source.
    #[serde(rename = "geotile_grid")]
    GeoTileGrid(GeoTileGridCompositeAggregationSource),
}

impl CompositeAggregationSource {
    pub(crate) fn field(&self) -> &str {
        match self {
            CompositeAggregationSource::Terms(source) => &source.field,
            CompositeAggregationSource::Histogram(source) => &source.field,
            CompositeAggregationSource::DateHistogram(source) => &source.field,
            CompositeAggregationSource::GeoTileGrid(source) => &source.field,
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            CompositeAggregationSource::Terms(source) => &source.name,
            CompositeAggregationSource::Histogram(source) => &source.name,
            CompositeAggregationSource::DateHistogram(source) => &source.name,
            CompositeAggregationSource::GeoTileGrid(source) => &source.name,
        }
    }

    fn set_name(&mut self, name: String) {
        match self {
            CompositeAggregationSource::Terms(source) => source.name = name,
            CompositeAggregationSource::Histogram(source) => source.name = name,
            CompositeAggregationSource::DateHistogram(source) => source.name = name,
            CompositeAggregationSource::GeoTileGrid(source) => source.name = name,
        }
    }

    pub(crate) fn order(&self) -> Order {
        match self {
            CompositeAggregationSource::Terms(source) => source.order,
            CompositeAggregationSource::Histogram(source) => source.order,
            CompositeAggregationSource::DateHistogram(source) => source.order,
            CompositeAggregationSource::GeoTileGrid(source) => source.order,
        }
    }

    pub(crate) fn missing_order(&self) -> MissingOrder {
        match self {
            CompositeAggregationSource::Terms(source) => source.missing_order,
            CompositeAggregationSource::Histogram(source) => source.missing_order,
            CompositeAggregationSource::DateHistogram(source) => source.missing_order,
            CompositeAggregationSource::GeoTileGrid(source) => source.missing_order,
        }
    }

    pub(crate) fn missing_bucket(&self) -> bool {
        match self {
            CompositeAggregationSource::Terms(source) => source.missing_bucket,
            CompositeAggregationSource::Histogram(source) => source.missing_bucket,
            CompositeAggregationSource::DateHistogram(source) => source.missing_bucket,
            CompositeAggregationSource::GeoTileGrid(source) => source.missing_bucket,
        }
    }
}

/// A paginable aggregation that performs on multiple dimensions (sources),
/// potentially mixing terms, histograms and geo tiles.
///
/// Pagination is made possible because the buckets are ordered by the composite
/// key, so the next page can be fetched "efficiently" by passing the last key
/// of a page as the `after` key of the next request.
///
/// # JSON Format
/// ```json
/// {
///     "sources": [
///         { "product": { "terms": { "field": "product" } } },
///         { "day": { "date_histogram": { "field": "timestamp", "calendar_interval": "day" } } }
///     ],
///     "size": 100,
///     "after": { "product": "shoes", "day": 1420070400000 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "CompositeAggregationSerde",
    into = "CompositeAggregationSerde"
)]
pub struct CompositeAggregation {
    /// The fields and bucketting strategies.
    pub sources: Vec<CompositeAggregationSource>,
    /// Number of buckets to return (page size).
    pub size: u32,
    /// The key of the previous page's last bucket.
    pub after: FxHashMap<String, CompositeKey>,
}

#[derive(Serialize, Deserialize)]
struct CompositeAggregationSerde {
    sources: Vec<FxHashMap<String, CompositeAggregationSource>>,
    #[serde(default = "default_size")]
    size: u32,
    #[serde(default, skip_serializing_if = "FxHashMap::is_empty")]
    after: FxHashMap<String, CompositeKey>,
}

impl TryFrom<CompositeAggregationSerde> for CompositeAggregation {
    type Error = AggregationError;

    fn try_from(value: CompositeAggregationSerde) -> Result<Self, Self::Error> {
        let mut sources = Vec::with_capacity(value.sources.len());
        for map in value.sources {
            if map.len() != 1 {
                return Err(AggregationError::InvalidArgument(
                    "each composite source must have exactly one named entry".to_string(),
                ));
            }
            for (name, mut source) in map {
                source.set_name(name);
                sources.push(source);
            }
        }
        Ok(CompositeAggregation {
            sources,
            size: value.size,
            after: value.after,
        })
    }
}

impl From<CompositeAggregation> for CompositeAggregationSerde {
    fn from(value: CompositeAggregation) -> Self {
        let sources = value
            .sources
            .into_iter()
            .map(|source| {
                // name is #[serde(skip)] so it won't be serialized inside the value
                let mut map = FxHashMap::default();
                map.insert(source.name().to_string(), source);
                map
            })
            .collect();
        CompositeAggregationSerde {
            sources,
            size: value.size,
            after: value.after,
        }
    }
}

/// A composite aggregation and the metric aggregations nested in it.
///
/// # JSON Format
/// ```json
/// {
///     "composite": { "sources": [ { "color": { "terms": { "field": "color" } } } ] },
///     "aggs": { "avg_price": { "avg": { "field": "price" } } }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeAggregationRequest {
    /// The bucket aggregation.
    pub composite: CompositeAggregation,
    /// Metrics computed on every bucket, by name.
    #[serde(default, skip_serializing_if = "FxHashMap::is_empty")]
    pub aggs: FxHashMap<String, MetricAggregation>,
}
