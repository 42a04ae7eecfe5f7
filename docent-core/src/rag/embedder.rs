//! Embedding generation using LLM providers.
//!
//! This module converts text into vector embeddings through the provider's
//! embedding endpoint. The embedding model itself is a black box.

use crate::provider::{Provider, ProviderError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The provider API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider returned a different number of vectors than texts sent.
    #[error("Expected {expected} embeddings, received {received}")]
    CountMismatch { expected: usize, received: usize },
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

/// Generates vector embeddings for text using a provider embedding model.
///
/// The embedder is cheap to clone and is shared between the index that was
/// built with it and the retrievers created from that index, so queries are
/// always embedded with the same model as the chunks.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates a vector embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider API is unreachable
    /// - The model is not available
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.provider
            .embed(text, &self.model)
            .await
            .map_err(EmbedderError::Provider)
    }

    /// Generates embeddings for a batch of texts, preserving input order.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.provider.embed_batch(texts, &self.model).await?;

        if embeddings.len() != texts.len() {
            return Err(EmbedderError::CountMismatch {
                expected: texts.len(),
                received: embeddings.len(),
            });
        }

        Ok(embeddings)
    }
}
