use crate::index::Index;
use crate::index::segment_writer::SegmentWriter;
use crate::schema::Document;

/// Buffers documents and seals them into a new segment on every `commit`.
pub struct IndexWriter {
    index: Index,
    segment_writer: SegmentWriter,
}

impl IndexWriter {
    pub(crate) fn new(index: Index) -> IndexWriter {
        let segment_writer = SegmentWriter::new(index.schema());
        IndexWriter {
            index,
            segment_writer,
        }
    }

    /// Adds a document.
    ///
    /// The document is validated against the schema, and becomes searchable
    /// after the next commit.
    pub fn add_document(&mut self, doc: Document) -> crate::Result<()> {
        self.segment_writer.add_document(doc)
    }

    /// Number of documents waiting for the next commit.
    pub fn num_buffered_docs(&self) -> usize {
        self.segment_writer.num_docs()
    }

    /// Seals the buffered documents into a new segment.
    ///
    /// Committing without buffered documents is a no-op.
    pub fn commit(&mut self) -> crate::Result<()> {
        if self.segment_writer.num_docs() == 0 {
            return Ok(());
        }
        let segment_writer = std::mem::replace(
            &mut self.segment_writer,
            SegmentWriter::new(self.index.schema()),
        );
        let settings = self.index.settings();
        self.index
            .publish_segment(|segment_ord| segment_writer.finalize(segment_ord, settings))
    }
}
