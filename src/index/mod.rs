//! In-RAM index: schema, settings, segments and the searcher over them.

#[allow(clippy::module_inception)]
mod index;
mod index_meta;
mod index_writer;
mod searcher;
mod segment_reader;
mod segment_writer;

pub use self::index::{Index, IndexBuilder};
pub use self::index_meta::{IndexSettings, IndexSortByField, Order};
pub use self::index_writer::IndexWriter;
pub use self::searcher::Searcher;
pub use self::segment_reader::SegmentReader;
