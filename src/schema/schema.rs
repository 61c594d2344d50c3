use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::AggregationError;
use crate::schema::{Document, Field, FieldEntry, FieldOptions, FieldType};

/// Every field is declared up front with its type and whether it gets a
/// column (`FAST`) and postings (`INDEXED`).
///
/// Fields cannot be removed.
///
/// # Examples
///
/// ```
/// use composite_agg::schema::*;
///
/// let mut schema_builder = Schema::builder();
/// let id_field = schema_builder.add_str_field("id", FAST | INDEXED);
/// let price_field = schema_builder.add_f64_field("price", FAST);
/// let schema = schema_builder.build();
/// assert_eq!(schema.get_field("price").unwrap(), price_field);
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldEntry>,
    fields_map: FxHashMap<String, Field>,
}

impl SchemaBuilder {
    /// Create a new `SchemaBuilder`
    pub fn new() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Adds a new string field, with ordinal (dictionary) encoded values.
    pub fn add_str_field(&mut self, field_name: &str, options: FieldOptions) -> Field {
        self.add_field(FieldEntry::new(field_name.to_string(), FieldType::Str, options))
    }

    /// Adds a new bytes field.
    pub fn add_bytes_field(&mut self, field_name: &str, options: FieldOptions) -> Field {
        self.add_field(FieldEntry::new(field_name.to_string(), FieldType::Bytes, options))
    }

    /// Adds a new i64 field.
    pub fn add_i64_field(&mut self, field_name: &str, options: FieldOptions) -> Field {
        self.add_field(FieldEntry::new(field_name.to_string(), FieldType::I64, options))
    }

    /// Adds a new f64 field.
    pub fn add_f64_field(&mut self, field_name: &str, options: FieldOptions) -> Field {
        self.add_field(FieldEntry::new(field_name.to_string(), FieldType::F64, options))
    }

    /// Adds a new date field.
    ///
    /// Dates are stored as i64 timestamps in milliseconds since the epoch.
    pub fn add_date_field(&mut self, field_name: &str, options: FieldOptions) -> Field {
        self.add_field(FieldEntry::new(field_name.to_string(), FieldType::Date, options))
    }

    /// Adds a new geo-point field. Geo points cannot be indexed.
    pub fn add_geo_point_field(&mut self, field_name: &str, options: FieldOptions) -> Field {
        self.add_field(FieldEntry::new(field_name.to_string(), FieldType::GeoPoint, options))
    }

    /// Adds a field entry to the schema in build.
    ///
    /// Adding a field with a name that already exists shadows the previous one.
    pub fn add_field(&mut self, field_entry: FieldEntry) -> Field {
        let field = Field::from_field_id(self.fields.len() as u32);
        let field_name = field_entry.name().to_string();
        self.fields.push(field_entry);
        self.fields_map.insert(field_name, field);
        field
    }

    /// Finalize the creation of a `Schema`
    pub fn build(self) -> Schema {
        Schema(Arc::new(InnerSchema {
            fields: self.fields,
            fields_map: self.fields_map,
        }))
    }
}

#[derive(Debug)]
struct InnerSchema {
    fields: Vec<FieldEntry>,
    fields_map: FxHashMap<String, Field>,
}

/// Schema of an index. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Schema(Arc<InnerSchema>);

impl Schema {
    /// Creates a new builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Return the `FieldEntry` associated with a `Field`.
    pub fn get_field_entry(&self, field: Field) -> &FieldEntry {
        &self.0.fields[field.field_id() as usize]
    }

    /// Return the field name for a given `Field`.
    pub fn get_field_name(&self, field: Field) -> &str {
        self.get_field_entry(field).name()
    }

    /// Returns an iterator over the fields in the schema.
    pub fn fields(&self) -> impl Iterator<Item = (Field, &FieldEntry)> {
        self.0
            .fields
            .iter()
            .enumerate()
            .map(|(field_id, field_entry)| (Field::from_field_id(field_id as u32), field_entry))
    }

    /// Returns the field associated with a given name.
    pub fn get_field(&self, field_name: &str) -> crate::Result<Field> {
        self.0
            .fields_map
            .get(field_name)
            .copied()
            .ok_or_else(|| AggregationError::SchemaError(format!("Field not found: '{field_name}'")))
    }

    /// Checks every value of the document against its field type.
    pub fn validate_document(&self, doc: &Document) -> crate::Result<()> {
        for field_value in doc.field_values() {
            let field_id = field_value.field().field_id() as usize;
            let Some(field_entry) = self.0.fields.get(field_id) else {
                return Err(AggregationError::SchemaError(format!(
                    "Unknown field id {field_id}"
                )));
            };
            if !field_entry.field_type().accepts(field_value.value()) {
                return Err(AggregationError::SchemaError(format!(
                    "Value {:?} is not compatible with the {:?} field '{}'",
                    field_value.value(),
                    field_entry.field_type(),
                    field_entry.name()
                )));
            }
            if let crate::schema::Value::GeoPoint(point) = field_value.value() {
                if !point.is_valid() {
                    return Err(AggregationError::SchemaError(format!(
                        "Invalid geo point {point:?} for field '{}'",
                        field_entry.name()
                    )));
                }
            }
        }
        Ok(())
    }
}
