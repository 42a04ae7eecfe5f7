//! Ollama provider implementation.
//!
//! This module provides an Ollama HTTP API client that implements the Provider trait.

use super::types::*;
use crate::config::LlmConfig;
use async_trait::async_trait;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Ollama HTTP API provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Creates a new Ollama provider talking to `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists the models the server has pulled.
    ///
    /// Doubles as a reachability check: a server that is not running fails
    /// with [`ProviderError::Request`].
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api(error_text));
        }

        let tags = response.json::<OllamaTagsResponse>().await?;
        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }

    async fn request_embeddings(&self, input: Vec<String>, model: &str) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let expected = input.len();

        let embed_request = EmbedRequest {
            model: model.to_string(),
            input,
        };

        let response = self.http_client.post(&url).json(&embed_request).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api(error_text));
        }

        let embed_response = response.json::<EmbedResponse>().await?;
        if embed_response.embeddings.len() != expected {
            return Err(ProviderError::Other(format!(
                "Expected {} embeddings, got {}",
                expected,
                embed_response.embeddings.len()
            )));
        }

        Ok(embed_response.embeddings)
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn chat<'a>(
        &'a self,
        request: ChatRequest,
        mut callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
    ) -> Result<()> {
        let url = format!("{}/api/chat", self.base_url);

        let mut options = HashMap::new();
        options.insert("temperature".to_string(), serde_json::json!(request.temperature));
        if let Some(stop) = &request.stop {
            options.insert("stop".to_string(), serde_json::json!(stop));
        }

        let ollama_request = OllamaChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            options: Some(options),
            stream: true,
        };

        let response = self.http_client.post(&url).json(&ollama_request).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api(error_text));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.drain(..=newline_pos).collect::<Vec<_>>();

                if line.len() <= 1 {
                    continue;
                }

                let line_str = String::from_utf8_lossy(&line[..line.len() - 1]);

                match serde_json::from_str::<OllamaChatResponse>(&line_str) {
                    Ok(ollama_response) => callback(ChatResponse {
                        model: ollama_response.model,
                        content: ollama_response.message.content,
                        done: ollama_response.done,
                    }),
                    Err(e) => {
                        if let Ok(stream_error) = serde_json::from_str::<OllamaError>(&line_str) {
                            return Err(ProviderError::Api(stream_error.error));
                        }
                        debug!(error = %e, "Skipping unparseable stream line");
                    }
                }
            }
        }

        Ok(())
    }

    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.request_embeddings(vec![text.to_string()], model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No embeddings returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let input = texts.iter().map(|text| text.to_string()).collect();
        self.request_embeddings(input, model).await
    }
}

// Ollama-specific request/response types (internal)

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<HashMap<String, serde_json::Value>>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
}

/// Error object Ollama writes into the stream, e.g. for an unknown model.
#[derive(Debug, Clone, Deserialize)]
struct OllamaError {
    error: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaModelTag {
    name: String,
}
