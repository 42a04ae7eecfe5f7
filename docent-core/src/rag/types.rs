use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A bounded span of text taken from one source document.
///
/// `text` is always exactly `source[byte_range]`, so chunks of a document can
/// be stitched back together from their offsets. Chunks are immutable once
/// produced by the splitter.
///
/// # Example
///
/// ```
/// # use docent_core::rag::Chunk;
/// let chunk = Chunk::new("notes.txt", "Hello world", 0, 0..11);
/// assert_eq!(chunk.byte_range.len(), chunk.text.len());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source_id: String,
    pub text: String,
    /// Position of this chunk among the chunks of its source, from 0.
    pub sequence_index: usize,
    pub byte_range: Range<usize>,
}

impl Chunk {
    pub fn new(
        source_id: impl Into<String>,
        text: impl Into<String>,
        sequence_index: usize,
        byte_range: Range<usize>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            sequence_index,
            byte_range,
        }
    }
}

/// A chunk paired with its embedding. Owned by the vector index.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A retrieved chunk and its relevance to the query.
///
/// # Score Range
///
/// Relevance is the cosine similarity between query and chunk embeddings:
/// - `1.0` - Identical direction (perfect match)
/// - `0.0` - Orthogonal vectors (no similarity)
/// - `-1.0` - Opposite vectors
///
/// Results are produced fresh for every query and never retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
}
