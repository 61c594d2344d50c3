//! Per-segment columnar storage.
//!
//! Every fast field gets a column in every segment. A column maps each doc of
//! the segment to its values, sorted and deduplicated. String and bytes
//! columns store term ordinals into a segment-local sorted [`Dictionary`];
//! [`GlobalOrdinals`] merges those dictionaries so that ordinals can be
//! compared across segments.

#[allow(clippy::module_inception)]
mod column;
mod dictionary;
mod dictionary_encoded;
mod dynamic_column;
mod global_ordinals;

pub use self::column::Column;
pub use self::dictionary::Dictionary;
pub use self::dictionary_encoded::{BytesColumn, StrColumn};
pub use self::dynamic_column::DynamicColumn;
pub use self::global_ordinals::GlobalOrdinals;
