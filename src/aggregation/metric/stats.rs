use serde::{Deserialize, Serialize};

use super::{MetricAggregation, SCORE_FIELD};
use crate::aggregation::agg_limits::{AggregationLimits, ResourceLimitGuard};
use crate::aggregation::agg_result::MetricResult;
use crate::aggregation::sub_aggregation::BucketCollector;
use crate::column::DynamicColumn;
use crate::schema::{Field, Schema};
use crate::{AggregationError, DocId, Score, SegmentReader};

/// Stats contains a collection of statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// The number of values.
    pub count: u64,
    /// The sum of the values.
    pub sum: f64,
    /// The min value of the values.
    pub min: Option<f64>,
    /// The max value of the values.
    pub max: Option<f64>,
    /// The average of the values. `None` if count equals zero.
    pub avg: Option<f64>,
}

impl Stats {
    pub(crate) fn get_value(&self, agg_property: &str) -> crate::Result<Option<f64>> {
        match agg_property {
            "count" => Ok(Some(self.count as f64)),
            "sum" => Ok(Some(self.sum)),
            "min" => Ok(self.min),
            "max" => Ok(self.max),
            "avg" => Ok(self.avg),
            _ => Err(AggregationError::InvalidArgument(format!(
                "Unknown property {agg_property} on stats metric aggregation"
            ))),
        }
    }
}

/// Running statistics of one bucket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct IntermediateStats {
    /// The number of extracted values.
    count: u64,
    /// The sum of the extracted values.
    sum: f64,
    /// The min value.
    min: f64,
    /// The max value.
    max: f64,
}

impl Default for IntermediateStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
        }
    }
}

impl IntermediateStats {
    /// Computes the final stats value.
    pub fn finalize(&self) -> Stats {
        let min = if self.count == 0 {
            None
        } else {
            Some(self.min)
        };
        let max = if self.count == 0 {
            None
        } else {
            Some(self.max)
        };
        let avg = if self.count == 0 {
            None
        } else {
            Some(self.sum / (self.count as f64))
        };
        Stats {
            count: self.count,
            sum: self.sum,
            min,
            max,
            avg,
        }
    }

    #[inline]
    fn collect(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Which metric the running stats are finalized into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatsType {
    Average,
    Count,
    Max,
    Min,
    Stats,
    Sum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StatsSource {
    Score,
    Field(Field),
}

/// Collects the running stats of every bucket of a composite aggregation.
pub(crate) struct StatsCollector {
    collecting_for: StatsType,
    source: StatsSource,
    column: Option<DynamicColumn>,
    stats: Vec<IntermediateStats>,
    guard: ResourceLimitGuard,
}

impl StatsCollector {
    /// Checks that the requested field is a numeric fast field, or the score.
    pub fn from_req(
        req: &MetricAggregation,
        schema: &Schema,
        limits: &AggregationLimits,
    ) -> crate::Result<Self> {
        let field_name = req.field_name();
        let source = if field_name == SCORE_FIELD {
            StatsSource::Score
        } else {
            let field = schema.get_field(field_name)?;
            let field_entry = schema.get_field_entry(field);
            if !field_entry.field_type().is_numeric() {
                return Err(AggregationError::InvalidArgument(format!(
                    "Metric aggregations need a numeric field, '{field_name}' is of type {:?}",
                    field_entry.field_type()
                )));
            }
            if !field_entry.is_fast() {
                return Err(AggregationError::SchemaError(format!(
                    "Field '{field_name}' is not a fast field"
                )));
            }
            StatsSource::Field(field)
        };
        Ok(StatsCollector {
            collecting_for: req.stats_type(),
            source,
            column: None,
            stats: Vec::new(),
            guard: limits.new_guard(),
        })
    }
}

impl BucketCollector for StatsCollector {
    fn requires_scoring(&self) -> bool {
        self.source == StatsSource::Score
    }

    fn begin(&mut self, num_buckets: usize) -> crate::Result<()> {
        let num_bytes = num_buckets * std::mem::size_of::<IntermediateStats>();
        self.guard.add_memory_consumed(num_bytes as u64)?;
        self.stats = vec![IntermediateStats::default(); num_buckets];
        Ok(())
    }

    fn begin_segment(&mut self, segment: &SegmentReader) -> crate::Result<()> {
        if let StatsSource::Field(field) = self.source {
            self.column = Some(segment.column(field)?.clone());
        }
        Ok(())
    }

    #[inline]
    fn collect(&mut self, doc: DocId, score: Score, bucket_ord: u32) -> crate::Result<()> {
        let stats = self.stats.get_mut(bucket_ord as usize).ok_or_else(|| {
            AggregationError::InternalError(format!("Unknown bucket ordinal {bucket_ord}"))
        })?;
        match self.source {
            StatsSource::Score => stats.collect(score as f64),
            StatsSource::Field(_) => {
                let vals = self
                    .column
                    .as_ref()
                    .and_then(|column| column.numeric_values_for_doc(doc));
                for val in vals.into_iter().flatten() {
                    stats.collect(val);
                }
            }
        }
        Ok(())
    }

    fn bucket_result(&self, bucket_ord: u32) -> crate::Result<MetricResult> {
        let stats = self
            .stats
            .get(bucket_ord as usize)
            .copied()
            .unwrap_or_default()
            .finalize();
        let result = match self.collecting_for {
            StatsType::Average => MetricResult::Average(stats.avg.into()),
            StatsType::Count => MetricResult::Count((stats.count as f64).into()),
            StatsType::Max => MetricResult::Max(stats.max.into()),
            StatsType::Min => MetricResult::Min(stats.min.into()),
            StatsType::Stats => MetricResult::Stats(stats),
            StatsType::Sum => MetricResult::Sum(stats.sum.into()),
        };
        Ok(result)
    }
}
