use serde::{Deserialize, Serialize};

/// `Field` is a `u32` identifying a field.
///
/// The schema is in charge of holding mapping between field names
/// to `Field` objects.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash, Serialize, Deserialize)]
pub struct Field(u32);

impl Field {
    /// Create a new field object for the given FieldId.
    pub const fn from_field_id(field_id: u32) -> Field {
        Field(field_id)
    }

    /// Returns a u32 identifying uniquely a field within a schema.
    pub const fn field_id(self) -> u32 {
        self.0
    }
}
