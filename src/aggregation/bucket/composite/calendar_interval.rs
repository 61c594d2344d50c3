use time::{Month, Time, UtcDateTime};

use super::interval::MS_IN_DAY;

const NS_IN_MS: i128 = 1_000_000;

fn to_datetime(timestamp_ms: i64) -> Result<UtcDateTime, time::Error> {
    Ok(UtcDateTime::from_unix_timestamp_nanos(
        timestamp_ms as i128 * NS_IN_MS,
    )?)
}

fn to_millis(datetime: UtcDateTime) -> i64 {
    (datetime.unix_timestamp_nanos() / NS_IN_MS) as i64
}

fn bucket_error(interval: &str, timestamp_ms: i64, err: time::Error) -> crate::AggregationError {
    crate::AggregationError::InvalidArgument(format!(
        "Failed to compute {interval} bucket for timestamp {timestamp_ms}: {err}"
    ))
}

/// Computes the timestamp in milliseconds corresponding to the beginning of
/// the year (January 1st at midnight UTC).
pub(super) fn try_year_bucket(timestamp_ms: i64) -> crate::Result<i64> {
    year_bucket_using_time_crate(timestamp_ms).map_err(|err| bucket_error("year", timestamp_ms, err))
}

/// Computes the timestamp in milliseconds corresponding to the beginning of
/// the quarter (January, April, July or October 1st at midnight UTC).
pub(super) fn try_quarter_bucket(timestamp_ms: i64) -> crate::Result<i64> {
    quarter_bucket_using_time_crate(timestamp_ms)
        .map_err(|err| bucket_error("quarter", timestamp_ms, err))
}

/// Computes the timestamp in milliseconds corresponding to the beginning of
/// the month (1st at midnight UTC).
pub(super) fn try_month_bucket(timestamp_ms: i64) -> crate::Result<i64> {
    month_bucket_using_time_crate(timestamp_ms)
        .map_err(|err| bucket_error("month", timestamp_ms, err))
}

/// Computes the timestamp in milliseconds corresponding to the beginning of
/// the week (Monday at midnight UTC).
///
/// Returns `None` if that Monday is not representable in milliseconds.
pub(super) fn week_bucket(timestamp_ms: i64) -> Option<i64> {
    // 1970-01-01 was a Thursday (weekday = 4)
    let days_since_epoch = timestamp_ms.div_euclid(MS_IN_DAY);
    // Find the weekday: 0=Monday, ..., 6=Sunday
    let weekday = (days_since_epoch + 3).rem_euclid(7);
    let monday_days_since_epoch = days_since_epoch - weekday;
    monday_days_since_epoch.checked_mul(MS_IN_DAY)
}

fn year_bucket_using_time_crate(timestamp_ms: i64) -> Result<i64, time::Error> {
    let datetime = to_datetime(timestamp_ms)?
        .replace_ordinal(1)?
        .replace_time(Time::MIDNIGHT);
    Ok(to_millis(datetime))
}

fn quarter_bucket_using_time_crate(timestamp_ms: i64) -> Result<i64, time::Error> {
    let datetime = to_datetime(timestamp_ms)?;
    let month = u8::from(datetime.month());
    let first_month_of_quarter = Month::try_from((month - 1) / 3 * 3 + 1)?;
    let datetime = datetime
        .replace_day(1)?
        .replace_month(first_month_of_quarter)?
        .replace_time(Time::MIDNIGHT);
    Ok(to_millis(datetime))
}

fn month_bucket_using_time_crate(timestamp_ms: i64) -> Result<i64, time::Error> {
    let datetime = to_datetime(timestamp_ms)?
        .replace_day(1)?
        .replace_time(Time::MIDNIGHT);
    Ok(to_millis(datetime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::date::parse_date;

    fn ts_ms(rfc3339: &str) -> i64 {
        parse_date(rfc3339).unwrap()
    }

    #[test]
    fn test_year_bucket() {
        let ts = ts_ms("1970-01-01T00:00:00Z");
        assert_eq!(try_year_bucket(ts).unwrap(), ts_ms("1970-01-01T00:00:00Z"));

        let ts = ts_ms("1970-06-01T10:00:01.010Z");
        assert_eq!(try_year_bucket(ts).unwrap(), ts_ms("1970-01-01T00:00:00Z"));

        let ts = ts_ms("2008-12-31T23:59:59.999Z"); // leap year
        assert_eq!(try_year_bucket(ts).unwrap(), ts_ms("2008-01-01T00:00:00Z"));

        let ts = ts_ms("1969-07-20T20:17:00Z");
        assert_eq!(try_year_bucket(ts).unwrap(), ts_ms("1969-01-01T00:00:00Z"));
    }

    #[test]
    fn test_quarter_bucket() {
        let ts = ts_ms("2021-02-28T13:00:00Z");
        assert_eq!(try_quarter_bucket(ts).unwrap(), ts_ms("2021-01-01T00:00:00Z"));

        let ts = ts_ms("2021-05-31T23:59:59.999Z");
        assert_eq!(try_quarter_bucket(ts).unwrap(), ts_ms("2021-04-01T00:00:00Z"));

        let ts = ts_ms("2021-12-31T00:00:00Z");
        assert_eq!(try_quarter_bucket(ts).unwrap(), ts_ms("2021-10-01T00:00:00Z"));

        let ts = ts_ms("2021-07-01T00:00:00Z");
        assert_eq!(try_quarter_bucket(ts).unwrap(), ts_ms("2021-07-01T00:00:00Z"));
    }

    #[test]
    fn test_month_bucket() {
        let ts = ts_ms("1970-01-15T00:00:00Z");
        assert_eq!(try_month_bucket(ts).unwrap(), ts_ms("1970-01-01T00:00:00Z"));

        let ts = ts_ms("1970-02-01T00:00:00Z");
        assert_eq!(try_month_bucket(ts).unwrap(), ts_ms("1970-02-01T00:00:00Z"));

        let ts = ts_ms("2000-01-31T23:59:59.999Z");
        assert_eq!(try_month_bucket(ts).unwrap(), ts_ms("2000-01-01T00:00:00Z"));
    }

    #[test]
    fn test_week_bucket() {
        let ts = ts_ms("1970-01-05T00:00:00Z"); // Monday
        assert_eq!(week_bucket(ts), Some(ts_ms("1970-01-05T00:00:00Z")));

        let ts = ts_ms("1970-01-07T01:13:00Z"); // Wednesday
        assert_eq!(week_bucket(ts), Some(ts_ms("1970-01-05T00:00:00Z")));

        let ts = ts_ms("1970-01-11T23:59:59.999Z"); // Sunday
        assert_eq!(week_bucket(ts), Some(ts_ms("1970-01-05T00:00:00Z")));

        let ts = ts_ms("2025-10-16T10:41:59.010Z"); // Thursday
        assert_eq!(week_bucket(ts), Some(ts_ms("2025-10-13T00:00:00Z")));

        let ts = ts_ms("1970-01-01T00:00:00Z"); // Thursday
        assert_eq!(week_bucket(ts), Some(ts_ms("1969-12-29T00:00:00Z")));

        assert_eq!(week_bucket(i64::MIN), None);
    }
}
