use crate::schema::{FieldOptions, FieldType};

/// A `FieldEntry` represents a field and its configuration.
/// `Schema` are a collection of `FieldEntry`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldEntry {
    name: String,
    field_type: FieldType,
    options: FieldOptions,
}

impl FieldEntry {
    pub(crate) fn new(name: String, field_type: FieldType, options: FieldOptions) -> FieldEntry {
        FieldEntry {
            name,
            field_type,
            options,
        }
    }

    /// Returns the name of the field
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns true if the field is a fast field
    pub fn is_fast(&self) -> bool {
        self.options.is_fast()
    }

    /// Returns true if the field has postings
    pub fn is_indexed(&self) -> bool {
        self.options.is_indexed()
    }
}
