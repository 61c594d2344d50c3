use serde::{Deserialize, Serialize};

use crate::schema::Value;

/// Type of the value a field holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 string, dictionary encoded.
    Str,
    /// Arbitrary bytes, dictionary encoded.
    Bytes,
    /// Signed 64-bits integer.
    I64,
    /// 64-bits float.
    F64,
    /// Date, stored as milliseconds since the epoch.
    Date,
    /// Latitude/longitude pair.
    GeoPoint,
}

impl FieldType {
    /// Returns true iff the value can be stored in a field of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::Str, Value::Str(_))
                | (FieldType::Bytes, Value::Bytes(_))
                | (FieldType::I64, Value::I64(_))
                | (FieldType::F64, Value::F64(_))
                | (FieldType::Date, Value::Date(_))
                | (FieldType::GeoPoint, Value::GeoPoint(_))
        )
    }

    /// Returns true for the types with a numerical column.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::I64 | FieldType::F64 | FieldType::Date)
    }
}
