use crate::document::{DocumentChunk, Metadata};

/// Splits plain text into overlapping word windows suitable for embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    /// Target chunk size in words
    chunk_size: usize,
    /// Words shared between consecutive chunks
    overlap: usize,
}

impl Chunker {
    /// Create a new Chunker with the given chunk size in words
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            // 10% overlap by default
            overlap: chunk_size / 10,
        }
    }

    /// Create a chunker with custom overlap
    ///
    /// The overlap is capped below `chunk_size` so every window advances.
    pub fn with_overlap(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk a source's text into documents ready for ingestion
    ///
    /// Ids are `"{source}#{index}"`; each chunk's metadata carries the source
    /// and its index. Whitespace is normalized, and text without any words
    /// yields no chunks.
    pub fn chunk(&self, source: &str, text: &str) -> Vec<DocumentChunk> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Vec::new();
        }
        let words: Vec<&str> = normalized.split(' ').collect();

        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(words.len());
            let index = chunks.len();

            chunks.push(
                DocumentChunk::new(format!("{}#{}", source, index), words[start..end].join(" "))
                    .with_metadata(
                        Metadata::new()
                            .with_source(source)
                            .with_chunk_index(index),
                    ),
            );

            if end >= words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
