use serde::{Deserialize, Serialize};

/// Search Index Settings.
///
/// Contains settings which are applied on the whole
/// index, like presort documents.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct IndexSettings {
    /// Sorts the documents by information
    /// provided in `IndexSortByField`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by_field: Option<IndexSortByField>,
}

/// Settings to presort the documents in an index
///
/// Presorting documents lets a composite aggregation on the sort field skip
/// whole ranges of docs.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct IndexSortByField {
    /// The field to sort the documents by
    pub field: String,
    /// The order to sort the documents by
    pub order: Order,
}

/// The order to sort by
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Ascending Order
    #[default]
    Asc,
    /// Descending Order
    Desc,
}

impl Order {
    /// return if the Order is ascending
    pub fn is_asc(&self) -> bool {
        self == &Order::Asc
    }

    /// return if the Order is descending
    pub fn is_desc(&self) -> bool {
        self == &Order::Desc
    }

    /// Applies the order to an ascending comparison.
    #[inline]
    pub fn apply(&self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Order::Asc => ordering,
            Order::Desc => ordering.reverse(),
        }
    }
}
