use crate::config::RetrieverConfig;
use crate::rag::{RetrievalResult, SharedIndex};
use async_trait::async_trait;
use docent_plugin::{Plugin, PluginError, PluginOutput, Result};
use tracing::{debug, info};

pub const SEARCH_DOCS_TOOL: &str = "search_docs_from_RAG";

/// Returned instead of an error when nothing has been ingested yet, so the
/// model can fall back to other knowledge.
pub const NO_DOCUMENTS_MESSAGE: &str =
    "No documents have been processed yet. Please upload and process documents first.";

pub const NO_MATCHES_MESSAGE: &str = "No relevant passages were found in the uploaded documents.";

/// Searches the session's indexed documents.
///
/// The plugin holds the session's [`SharedIndex`] rather than a retriever,
/// and resolves the current index on every call, so re-ingesting documents
/// takes effect on the next search without rebuilding the agent.
pub struct SearchDocsPlugin {
    index: SharedIndex,
    config: RetrieverConfig,
}

impl SearchDocsPlugin {
    pub fn new(index: SharedIndex, config: RetrieverConfig) -> Self {
        Self { index, config }
    }
}

#[async_trait]
impl Plugin for SearchDocsPlugin {
    fn name(&self) -> &str {
        SEARCH_DOCS_TOOL
    }

    fn description(&self) -> &str {
        "Searches the vector database of uploaded documents for passages relevant to the query. \
         Input should be a search query."
    }

    async fn execute(&self, input: &str) -> Result<PluginOutput> {
        let query = input.trim();
        if query.is_empty() {
            return Err(PluginError::InvalidInput("search query is empty".to_string()));
        }

        let Some(index) = self.index.current().await else {
            debug!("Search requested before any documents were indexed");
            return Ok(PluginOutput::new(NO_DOCUMENTS_MESSAGE));
        };

        let results = index
            .retriever(self.config)
            .retrieve(query)
            .await
            .map_err(|e| PluginError::ExecutionFailed(format!("Document search failed: {}", e)))?;

        info!(query = %query, result_count = results.len(), "Searched documents");

        if results.is_empty() {
            return Ok(PluginOutput::new(NO_MATCHES_MESSAGE));
        }

        let sources: Vec<_> = results
            .iter()
            .map(|result| {
                serde_json::json!({
                    "source": result.chunk.source_id,
                    "chunk": result.chunk.sequence_index,
                    "score": result.score,
                })
            })
            .collect();

        Ok(PluginOutput::new(format_results(&results)).with_metadata(serde_json::json!(sources)))
    }
}

/// Renders results as numbered passages with their source.
pub fn format_results(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "[{}] source: {} (chunk {})\n{}",
                i + 1,
                result.chunk.source_id,
                result.chunk.sequence_index,
                result.chunk.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
