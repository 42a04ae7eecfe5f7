//! In-memory vector index and its retriever.
//!
//! The index holds every chunk of one ingestion together with its embedding
//! and answers similarity queries with a linear cosine scan followed by MMR
//! re-ranking.

use super::embedder::{Embedder, EmbedderError};
use super::mmr::{self, cosine_similarity};
use super::types::{Chunk, EmbeddingRecord, RetrievalResult};
use crate::config::RetrieverConfig;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual} for {source_id}#{sequence_index}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        source_id: String,
        sequence_index: usize,
    },
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// An immutable, fully built vector index.
///
/// # Characteristics
///
/// - **Simple**: No external dependencies or setup required
/// - **Linear**: O(n * d) scan per query
/// - **Ephemeral**: Data is lost when the process ends
///
/// A rebuild produces a new `VectorIndex`; see [`SharedIndex`] for how a
/// session swaps it in.
pub struct VectorIndex {
    embedder: Embedder,
    records: Vec<EmbeddingRecord>,
    dimension: usize,
}

impl VectorIndex {
    /// Embeds every chunk and builds the index.
    ///
    /// Chunks are embedded in batches of `batch_size`. All vectors must share
    /// one dimension.
    pub async fn build(chunks: Vec<Chunk>, embedder: Embedder, batch_size: usize) -> Result<Self> {
        let batch_size = batch_size.max(1);
        let mut records = Vec::with_capacity(chunks.len());
        let mut dimension = 0;

        info!(chunk_count = chunks.len(), model = embedder.model(), "Building vector index");

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
            debug!("Embedding batch of {} chunks", texts.len());
            let vectors = embedder.embed_batch(&texts).await?;

            for (chunk, vector) in batch.iter().zip(vectors) {
                if records.is_empty() {
                    dimension = vector.len();
                } else if vector.len() != dimension {
                    return Err(IndexError::DimensionMismatch {
                        expected: dimension,
                        actual: vector.len(),
                        source_id: chunk.source_id.clone(),
                        sequence_index: chunk.sequence_index,
                    });
                }

                records.push(EmbeddingRecord {
                    chunk: chunk.clone(),
                    vector,
                });
            }
        }

        info!(chunk_count = records.len(), dimension, "Vector index built");
        Ok(Self {
            embedder,
            records,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    /// Creates a retriever over this index.
    pub fn retriever(self: &Arc<Self>, config: RetrieverConfig) -> Retriever {
        Retriever {
            index: Arc::clone(self),
            config,
        }
    }

    /// Returns up to `top_k` records ordered by descending cosine similarity.
    pub fn similarity_search(&self, query: &[f32], top_k: usize) -> Vec<(&EmbeddingRecord, f32)> {
        let mut scored: Vec<(&EmbeddingRecord, f32)> = self
            .records
            .iter()
            .map(|record| (record, cosine_similarity(query, &record.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored
    }

    /// Over-fetches `fetch_k` candidates and picks `k` of them by MMR.
    pub fn mmr_search(&self, query: &[f32], config: &RetrieverConfig) -> Vec<RetrievalResult> {
        let candidates = self.similarity_search(query, config.fetch_k.max(config.k));
        let pool: Vec<(f32, &[f32])> = candidates
            .iter()
            .map(|(record, score)| (*score, record.vector.as_slice()))
            .collect();

        mmr::select(&pool, config.k, config.lambda)
            .into_iter()
            .map(|i| RetrievalResult {
                chunk: candidates[i].0.chunk.clone(),
                score: candidates[i].1,
            })
            .collect()
    }
}

/// Query capability over one built index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Embeds the query and returns at most `k` diverse, relevant chunks.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.index.embedder.embed(query).await?;
        let results = self.index.mmr_search(&query_embedding, &self.config);
        info!(result_count = results.len(), "Retrieved chunks");
        Ok(results)
    }
}

/// The session's current index.
///
/// Holds either nothing (no documents ingested yet) or a fully built index.
/// A rebuild is swapped in with a single write, so readers observe either
/// the previous index or the new one, never a partial build.
#[derive(Clone, Default)]
pub struct SharedIndex {
    slot: Arc<RwLock<Option<Arc<VectorIndex>>>>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current index, if any.
    pub async fn current(&self) -> Option<Arc<VectorIndex>> {
        self.slot.read().await.clone()
    }

    /// Replaces the current index, returning the previous one.
    pub async fn replace(&self, index: Arc<VectorIndex>) -> Option<Arc<VectorIndex>> {
        self.slot.write().await.replace(index)
    }
}
