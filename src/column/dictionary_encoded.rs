use std::ops::Deref;

use crate::column::{Column, Dictionary};

/// Dictionary encoded column.
#[derive(Clone, Debug, Default)]
pub struct BytesColumn {
    pub(crate) dictionary: Dictionary,
    pub(crate) term_ord_column: Column<u64>,
}

impl BytesColumn {
    /// Returns `None` if the term does not exist (e.g. `term_ord` is greater or equal to the
    /// overall number of terms).
    pub fn ord_to_bytes(&self, term_ord: u64) -> Option<&[u8]> {
        self.dictionary.ord_to_term(term_ord)
    }

    /// The segment-local dictionary.
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Term ordinals of each doc.
    pub fn term_ords(&self) -> &Column<u64> {
        &self.term_ord_column
    }
}

/// Dictionary encoded column, with valid utf-8 terms.
#[derive(Clone, Debug, Default)]
pub struct StrColumn(BytesColumn);

impl From<BytesColumn> for StrColumn {
    fn from(bytes_col: BytesColumn) -> Self {
        StrColumn(bytes_col)
    }
}

impl StrColumn {
    /// Returns the term associated with a given term ordinal.
    pub fn ord_to_str(&self, term_ord: u64) -> Option<&str> {
        self.0
            .ord_to_bytes(term_ord)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

impl Deref for StrColumn {
    type Target = BytesColumn;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
