use serde::{Deserialize, Serialize};

/// A date, with millisecond precision, in UTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateTime {
    timestamp_millis: i64,
}

impl DateTime {
    /// Creates a `DateTime` from milliseconds since the epoch.
    pub const fn from_timestamp_millis(timestamp_millis: i64) -> DateTime {
        DateTime { timestamp_millis }
    }

    /// Creates a `DateTime` from seconds since the epoch.
    pub const fn from_timestamp_secs(timestamp_secs: i64) -> DateTime {
        DateTime {
            timestamp_millis: timestamp_secs * 1_000,
        }
    }

    /// Milliseconds since the epoch.
    pub const fn into_timestamp_millis(self) -> i64 {
        self.timestamp_millis
    }
}

/// A point on the earth, in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude, within `[-90, 90]`.
    pub lat: f64,
    /// Longitude, within `[-180, 180]`.
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a new point from its latitude and longitude.
    pub fn new(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint { lat, lon }
    }

    pub(crate) fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Value of a field within a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The str type is used for any text information.
    Str(String),
    /// Arbitrary bytes.
    Bytes(Vec<u8>),
    /// Signed 64-bits Integer `i64`
    I64(i64),
    /// 64-bits Float `f64`
    F64(f64),
    /// Date/time with millisecond precision
    Date(DateTime),
    /// Geographical point
    GeoPoint(GeoPoint),
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(s: &'a str) -> Value {
        Value::Str(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Value {
        Value::Bytes(bytes)
    }
}

impl<'a> From<&'a [u8]> for Value {
    fn from(bytes: &'a [u8]) -> Value {
        Value::Bytes(bytes.to_vec())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::F64(v)
    }
}

impl From<DateTime> for Value {
    fn from(dt: DateTime) -> Value {
        Value::Date(dt)
    }
}

impl From<GeoPoint> for Value {
    fn from(point: GeoPoint) -> Value {
        Value::GeoPoint(point)
    }
}
