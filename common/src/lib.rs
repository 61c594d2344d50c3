#![allow(clippy::len_without_is_empty)]

mod bitset;
mod byte_count;

pub use bitset::{BitSet, DocIdSetBuilder, TinySet};
pub use byte_count::ByteCount;
