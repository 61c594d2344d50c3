use std::ops::BitOr;

/// Options of a field.
///
/// A `FAST` field gets a columnar store in every segment, which is what
/// aggregations read. An `INDEXED` field also gets postings, sorted by value,
/// which lets a composite aggregation walk the segment by value instead of by
/// doc id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldOptions {
    fast: bool,
    indexed: bool,
}

impl FieldOptions {
    /// Returns true if the field has a column.
    pub fn is_fast(&self) -> bool {
        self.fast
    }

    /// Returns true if the field has postings.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Set the field as a fast field.
    #[must_use]
    pub fn set_fast(mut self) -> FieldOptions {
        self.fast = true;
        self
    }

    /// Set the field as indexed.
    #[must_use]
    pub fn set_indexed(mut self) -> FieldOptions {
        self.indexed = true;
        self
    }
}

/// Flag to mark the field as a fast field, readable column by column.
pub const FAST: FieldOptions = FieldOptions {
    fast: true,
    indexed: false,
};

/// Flag to mark the field as indexed. Its values get postings.
pub const INDEXED: FieldOptions = FieldOptions {
    fast: false,
    indexed: true,
};

impl BitOr for FieldOptions {
    type Output = FieldOptions;

    fn bitor(self, other: FieldOptions) -> FieldOptions {
        FieldOptions {
            fast: self.fast | other.fast,
            indexed: self.indexed | other.indexed,
        }
    }
}
