/// `doc!` is a shortcut that helps building `Document`
/// objects.
///
/// Assuming that `field1` and `field2` are `Field` instances.
/// You can create a document with a value of `value1` for `field1`
/// `value2` for `field2`, as follows :
///
/// ```c
/// doc!(
///     field1 => value1,
///     field2 => value2,
/// )
/// ```
///
/// The value can be a `&str`, a `String`, a `i64`, a `f64`, a `DateTime`,
/// a `GeoPoint` or a byte vector. Values are checked against the schema
/// when the document is added to the index.
///
/// # Example
///
/// ```rust
/// use composite_agg::schema::{Schema, FAST, INDEXED};
/// use composite_agg::doc;
///
/// let mut schema_builder = Schema::builder();
/// let category = schema_builder.add_str_field("category", FAST | INDEXED);
/// let price = schema_builder.add_i64_field("price", FAST);
/// let _schema = schema_builder.build();
/// let doc = doc!(
///     category => "books",
///     category => "used",
///     price => 12i64
/// );
/// assert_eq!(doc.len(), 3);
/// ```
#[macro_export]
macro_rules! doc(
    () => {
        {
            ($crate::schema::Document::default())
        }
    }; // avoids a warning due to the useless `mut`.
    ($($field:expr => $value:expr),*) => {
        {
            let mut document = $crate::schema::Document::default();
            $(
                document.add($crate::schema::FieldValue::new($field, $value.into()));
            )*
            document
        }
    };
    // if there is a trailing comma retry with the trailing comma stripped.
    ($($field:expr => $value:expr),+ ,) => {
        doc!( $( $field => $value ), *)
    };
);
