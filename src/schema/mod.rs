//! Schema definition and documents.
//!
//! A [`Schema`] declares the fields of an index and their [`FieldType`].
//! Documents are bags of `(Field, Value)` pairs; a field may be repeated to
//! make it multi-valued.

mod document;
mod field;
mod field_entry;
mod field_type;
mod flags;
#[allow(clippy::module_inception)]
mod schema;
mod value;

pub use self::document::{Document, FieldValue};
pub use self::field::Field;
pub use self::field_entry::FieldEntry;
pub use self::field_type::FieldType;
pub use self::flags::{FieldOptions, FAST, INDEXED};
pub use self::schema::{Schema, SchemaBuilder};
pub use self::value::{DateTime, GeoPoint, Value};
