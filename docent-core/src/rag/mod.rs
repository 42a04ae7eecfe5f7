//! Retrieval Augmented Generation (RAG) system.
//!
//! This module turns uploaded files into a searchable vector index.
//!
//! # Architecture
//!
//! - [`upload`]: uploaded files and their validation
//! - [`loader`]: text extraction per document kind, through scoped temp files
//! - [`splitter`]: recursive character splitting with overlap
//! - [`embedder`]: text to vector through the provider
//! - [`store`]: in-memory index, MMR retriever, and the swappable [`SharedIndex`]
//!
//! # How It Works
//!
//! 1. **Ingestion**:
//!    - Each upload is validated (extension, size, filename); failures are skipped
//!    - Valid uploads are extracted to text; failures are skipped
//!    - Every document is split into chunks (default: 1000 chars, 100 overlap)
//!
//! 2. **Indexing**:
//!    - Chunks are embedded in batches and stored with their vectors
//!
//! 3. **Retrieval**:
//!    - The query is embedded, the `fetch_k` nearest chunks are fetched, and
//!      `k` of them are chosen by maximal marginal relevance

pub mod embedder;
pub mod loader;
pub mod mmr;
pub mod splitter;
pub mod store;
mod types;
pub mod upload;

pub use embedder::{Embedder, EmbedderError};
pub use loader::{DocumentKind, DocumentLoader, ExtractionError, SourceDocument};
pub use splitter::{SplitterError, TextSplitter};
pub use store::{IndexError, Retriever, SharedIndex, VectorIndex};
pub use types::{Chunk, EmbeddingRecord, RetrievalResult};
pub use upload::{Upload, ValidationError};

use crate::config::{IngestConfig, RagConfig};
use crate::provider::Provider;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Too many files ({count}). Maximum allowed: {max}")]
    TooManyFiles { count: usize, max: usize },

    #[error("No valid documents were processed")]
    NoValidDocuments,

    #[error("Splitter error: {0}")]
    Splitter(#[from] SplitterError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Why a file was left out of an ingestion.
#[derive(Debug)]
pub enum SkipReason {
    Invalid(ValidationError),
    Extraction(ExtractionError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "{}", e),
            Self::Extraction(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug)]
pub struct SkippedFile {
    pub name: String,
    pub reason: SkipReason,
}

/// Result of a successful ingestion.
pub struct Ingested {
    pub index: Arc<VectorIndex>,
    /// Every chunk, in document then sequence order.
    pub chunks: Vec<Chunk>,
    pub skipped: Vec<SkippedFile>,
}

/// Validates, extracts, splits, and indexes uploaded files.
///
/// # Configuration
///
/// The pipeline uses configuration from [`Config`](crate::Config):
/// - `ingest.*`: file count, size, and extension limits
/// - `rag.chunk_size` / `rag.chunk_overlap`: splitter settings
/// - `rag.embedding_model` / `rag.embed_batch_size`: embedding settings
#[derive(Clone)]
pub struct IngestPipeline {
    limits: IngestConfig,
    loader: DocumentLoader,
    splitter: TextSplitter,
    embedder: Embedder,
    batch_size: usize,
}

impl IngestPipeline {
    pub fn new(ingest: &IngestConfig, rag: &RagConfig, provider: Arc<dyn Provider>) -> Result<Self> {
        Ok(Self {
            limits: ingest.clone(),
            loader: DocumentLoader::new(),
            splitter: TextSplitter::new(rag.chunk_size, rag.chunk_overlap)?,
            embedder: Embedder::new(provider, rag.embedding_model.clone()),
            batch_size: rag.embed_batch_size,
        })
    }

    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Extracts every valid upload, skipping and logging the rest.
    ///
    /// Fails only when the batch exceeds the file-count limit.
    pub fn extract(&self, uploads: &mut [Upload]) -> Result<(Vec<SourceDocument>, Vec<SkippedFile>)> {
        if uploads.len() > self.limits.max_files {
            return Err(IngestError::TooManyFiles {
                count: uploads.len(),
                max: self.limits.max_files,
            });
        }

        info!(file_count = uploads.len(), "Processing uploaded files");
        let mut documents = Vec::new();
        let mut skipped = Vec::new();

        for upload in uploads.iter_mut() {
            if let Err(e) = upload.validate(&self.limits) {
                warn!(file = %upload.name, reason = %e, "Skipping invalid file");
                skipped.push(SkippedFile {
                    name: upload.name.clone(),
                    reason: SkipReason::Invalid(e),
                });
                continue;
            }

            match self.loader.load(upload) {
                Ok(document) => {
                    info!(file = %upload.name, kind = ?document.kind, "Extracted document");
                    documents.push(document);
                }
                Err(e @ ExtractionError::UnsupportedType(_)) => {
                    warn!(file = %upload.name, content_type = %upload.content_type, "Unsupported file type");
                    skipped.push(SkippedFile {
                        name: upload.name.clone(),
                        reason: SkipReason::Extraction(e),
                    });
                }
                Err(e) => {
                    error!(file = %upload.name, error = %e, "Error processing file");
                    skipped.push(SkippedFile {
                        name: upload.name.clone(),
                        reason: SkipReason::Extraction(e),
                    });
                }
            }
        }

        Ok((documents, skipped))
    }

    /// Splits documents into chunks, preserving document and chunk order.
    ///
    /// Documents without any visible text contribute no chunks.
    pub fn split(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        documents
            .iter()
            .filter(|document| {
                let blank = document.text.trim().is_empty();
                if blank {
                    warn!(file = %document.source_id, "Document has no text");
                }
                !blank
            })
            .flat_map(|document| self.splitter.split_document(&document.source_id, &document.text))
            .collect()
    }

    /// Runs the whole pipeline and builds a fresh index.
    ///
    /// # Errors
    ///
    /// - [`IngestError::TooManyFiles`] if the batch is over the limit
    /// - [`IngestError::NoValidDocuments`] if no file survives validation and
    ///   extraction, or the survivors contain no text
    /// - [`IngestError::Index`] if embedding fails
    pub async fn process(&self, uploads: Vec<Upload>) -> Result<Ingested> {
        // File reads and PDF parsing block, so they run on the blocking pool.
        let pipeline = self.clone();
        let (documents, skipped) = tokio::task::spawn_blocking(move || {
            let mut uploads = uploads;
            pipeline.extract(&mut uploads)
        })
        .await??;

        if documents.is_empty() {
            return Err(IngestError::NoValidDocuments);
        }

        let chunks = self.split(&documents);
        if chunks.is_empty() {
            warn!("Extracted documents contain no text");
            return Err(IngestError::NoValidDocuments);
        }
        info!(
            document_count = documents.len(),
            chunk_count = chunks.len(),
            skipped = skipped.len(),
            "Split documents"
        );

        let index = VectorIndex::build(chunks.clone(), self.embedder.clone(), self.batch_size).await?;

        Ok(Ingested {
            index: Arc::new(index),
            chunks,
            skipped,
        })
    }
}
