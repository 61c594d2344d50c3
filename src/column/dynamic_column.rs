use crate::column::{BytesColumn, Column, StrColumn};
use crate::schema::{FieldType, GeoPoint};

/// Column of a fast field, typed after the field.
///
/// Date values are milliseconds since the epoch.
#[derive(Clone, Debug)]
pub enum DynamicColumn {
    I64(Column<i64>),
    F64(Column<f64>),
    Date(Column<i64>),
    Bytes(BytesColumn),
    Str(StrColumn),
    GeoPoint(Column<GeoPoint>),
}

impl DynamicColumn {
    /// Type of the field the column was built for.
    pub fn field_type(&self) -> FieldType {
        match self {
            DynamicColumn::I64(_) => FieldType::I64,
            DynamicColumn::F64(_) => FieldType::F64,
            DynamicColumn::Date(_) => FieldType::Date,
            DynamicColumn::Bytes(_) => FieldType::Bytes,
            DynamicColumn::Str(_) => FieldType::Str,
            DynamicColumn::GeoPoint(_) => FieldType::GeoPoint,
        }
    }

    /// Returns true if no doc has more than one value.
    pub fn is_single_valued(&self) -> bool {
        match self {
            DynamicColumn::I64(column) | DynamicColumn::Date(column) => column.is_single_valued(),
            DynamicColumn::F64(column) => column.is_single_valued(),
            DynamicColumn::Bytes(column) => column.term_ords().is_single_valued(),
            DynamicColumn::Str(column) => column.term_ords().is_single_valued(),
            DynamicColumn::GeoPoint(column) => column.is_single_valued(),
        }
    }

    /// Values of a doc as `f64`, for numeric columns.
    ///
    /// Returns `None` if the column is not numeric.
    pub fn numeric_values_for_doc(
        &self,
        doc: crate::DocId,
    ) -> Option<impl Iterator<Item = f64> + '_> {
        let (ints, floats): (&[i64], &[f64]) = match self {
            DynamicColumn::I64(column) | DynamicColumn::Date(column) => {
                (column.values_for_doc(doc), &[][..])
            }
            DynamicColumn::F64(column) => (&[][..], column.values_for_doc(doc)),
            _ => return None,
        };
        Some(
            ints.iter()
                .map(|val| *val as f64)
                .chain(floats.iter().copied()),
        )
    }
}
