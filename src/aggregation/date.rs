use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::AggregationError;

/// Parses an RFC3339 date into milliseconds since the epoch.
pub(crate) fn parse_date(date_string: &str) -> crate::Result<i64> {
    OffsetDateTime::parse(date_string, &Rfc3339)
        .map_err(|err| {
            AggregationError::InvalidArgument(format!(
                "Could not parse '{date_string}' as RFC3339 date, err: {err:?}"
            ))
        })
        .map(|datetime| datetime.unix_timestamp_nanos().div_euclid(1_000_000) as i64)
}
