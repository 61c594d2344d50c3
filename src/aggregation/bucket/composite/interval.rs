use thiserror::Error;

use super::calendar_interval::{
    try_month_bucket, try_quarter_bucket, try_year_bucket, week_bucket,
};
use super::{CalendarInterval, DateHistogramCompositeAggregationSource};
use crate::AggregationError;

const MS_IN_MINUTE: i64 = 60 * 1_000;
const MS_IN_HOUR: i64 = 60 * MS_IN_MINUTE;
pub(super) const MS_IN_DAY: i64 = 24 * MS_IN_HOUR;

/// Errors when parsing the fixed interval or the offset of a date histogram
/// source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateHistogramParseError {
    /// Unit not recognized in passed String
    #[error("unit not recognized: {0}")]
    UnitNotRecognized(String),
    /// Number not found in passed String
    #[error("number missing: {0}")]
    NumberMissing(String),
    /// Unit not found in passed String
    #[error("unit missing: {0}")]
    UnitMissing(String),
    /// Offset with invalid format
    #[error("invalid offset: {0}")]
    InvalidOffset(String),
}

fn parse_into_milliseconds(input: &str) -> Result<i64, DateHistogramParseError> {
    let split_boundary = input
        .as_bytes()
        .iter()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    let (number, unit) = input.split_at(split_boundary);
    if number.is_empty() {
        return Err(DateHistogramParseError::NumberMissing(input.to_string()));
    }
    if unit.is_empty() {
        return Err(DateHistogramParseError::UnitMissing(input.to_string()));
    }
    let number: i64 = number
        .parse()
        .map_err(|_err| DateHistogramParseError::NumberMissing(input.to_string()))?;

    let multiplier_from_unit = match unit {
        "ms" => 1,
        "s" => 1000,
        "m" => MS_IN_MINUTE,
        "h" => MS_IN_HOUR,
        "d" => MS_IN_DAY,
        _ => return Err(DateHistogramParseError::UnitNotRecognized(unit.to_string())),
    };
    number
        .checked_mul(multiplier_from_unit)
        .ok_or_else(|| DateHistogramParseError::NumberMissing(input.to_string()))
}

/// Parses offsets like `"+6h"` or `"-1d"`. The sign is optional.
fn parse_offset_into_milliseconds(input: &str) -> Result<i64, DateHistogramParseError> {
    let (is_negative, rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        Some(_) => (false, input),
        None => return Err(DateHistogramParseError::InvalidOffset(input.to_string())),
    };
    let millis = parse_into_milliseconds(rest)?;
    Ok(if is_negative { -millis } else { millis })
}

/// Rounding applied by a date histogram source to every timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum DateRounding {
    Fixed { interval: i64, offset: i64 },
    Calendar { interval: CalendarInterval, offset: i64 },
}

impl DateRounding {
    pub fn from_req(req: &DateHistogramCompositeAggregationSource) -> crate::Result<Self> {
        let offset = req
            .offset
            .as_deref()
            .map(parse_offset_into_milliseconds)
            .transpose()?
            .unwrap_or(0);
        match (&req.fixed_interval, req.calendar_interval) {
            (Some(fixed_interval), None) => {
                let interval = parse_into_milliseconds(fixed_interval)?;
                if interval <= 0 {
                    return Err(AggregationError::InvalidArgument(format!(
                        "fixed_interval of source '{}' must be strictly positive, got \
                         {fixed_interval}",
                        req.name
                    )));
                }
                Ok(DateRounding::Fixed { interval, offset })
            }
            (None, Some(interval)) => Ok(DateRounding::Calendar { interval, offset }),
            (Some(_), Some(_)) => Err(AggregationError::InvalidArgument(format!(
                "source '{}' sets both fixed_interval and calendar_interval",
                req.name
            ))),
            (None, None) => Err(AggregationError::InvalidArgument(format!(
                "source '{}' needs either a fixed_interval or a calendar_interval",
                req.name
            ))),
        }
    }

    /// Start of the interval containing `timestamp_ms`.
    ///
    /// The rounding is monotonic: `a <= b` implies `round(a) <= round(b)`.
    /// Fails if the bucket start does not fit in an `i64`.
    pub fn round(&self, timestamp_ms: i64) -> crate::Result<i64> {
        let overflow = || {
            AggregationError::InvalidArgument(format!(
                "date histogram bucket of timestamp {timestamp_ms} is out of range"
            ))
        };
        let (rounded, offset) = match *self {
            DateRounding::Fixed { interval, offset } => {
                let shifted = timestamp_ms.checked_sub(offset).ok_or_else(overflow)?;
                (floor_to_multiple(shifted, interval), offset)
            }
            DateRounding::Calendar { interval, offset } => {
                let shifted = timestamp_ms.checked_sub(offset).ok_or_else(overflow)?;
                let rounded = match interval {
                    CalendarInterval::Year => Some(try_year_bucket(shifted)?),
                    CalendarInterval::Quarter => Some(try_quarter_bucket(shifted)?),
                    CalendarInterval::Month => Some(try_month_bucket(shifted)?),
                    CalendarInterval::Week => week_bucket(shifted),
                    CalendarInterval::Day => floor_to_multiple(shifted, MS_IN_DAY),
                    CalendarInterval::Hour => floor_to_multiple(shifted, MS_IN_HOUR),
                    CalendarInterval::Minute => floor_to_multiple(shifted, MS_IN_MINUTE),
                };
                (rounded, offset)
            }
        };
        rounded
            .and_then(|rounded| rounded.checked_add(offset))
            .ok_or_else(overflow)
    }
}

fn floor_to_multiple(value: i64, interval: i64) -> Option<i64> {
    value.div_euclid(interval).checked_mul(interval)
}
