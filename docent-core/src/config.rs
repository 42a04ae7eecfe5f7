use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole assistant.
///
/// Every section has defaults, so a YAML file only needs the keys it
/// overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub rag: RagConfig,
    pub ingest: IngestConfig,
    pub agent: AgentConfig,
    pub chat: ChatConfig,
}

/// Configuration for the reasoning model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
}

/// Configuration for RAG processing.
///
/// This covers embedding settings, chunking, and retrieval behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub embedding_model: String,
    /// Target chunk length in characters
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks of one document
    pub chunk_overlap: usize,
    /// Number of chunks sent to the embedding service per request
    pub embed_batch_size: usize,
    pub retriever: RetrieverConfig,
}

/// Maximal-marginal-relevance retrieval parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Number of results returned
    pub k: usize,
    /// Size of the candidate pool re-ranked by MMR
    pub fetch_k: usize,
    /// 0.0 = pure diversity, 1.0 = pure relevance
    pub lambda: f32,
}

/// Limits applied to uploaded files before any content is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_file_size: u64,
    pub max_files: usize,
    /// Lowercase extensions without the leading dot
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Assistant turn seeded into every new session. `None` starts empty.
    pub greeting: Option<String>,
}

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 10;

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "qwen3:4b".to_string(),
            base_url: "http://localhost:11434".to_string(),
            temperature: 0.0,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: "all-minilm".to_string(),
            chunk_size: 1000,
            chunk_overlap: 100,
            embed_batch_size: 32,
            retriever: RetrieverConfig::default(),
        }
    }
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            k: 3,
            fetch_k: 6,
            lambda: 0.5,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            allowed_extensions: vec!["pdf".to_string(), "txt".to_string()],
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 6 }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: Some("Hello! How can I assist you today?".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.rag.retriever.validate()?;

        if self.rag.chunk_size == 0 {
            return Err(ConfigError::Invalid("rag.chunk_size must be positive".into()));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.embed_batch_size == 0 {
            return Err(ConfigError::Invalid("rag.embed_batch_size must be positive".into()));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::Invalid("agent.max_iterations must be positive".into()));
        }

        Ok(())
    }
}

impl RetrieverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(ConfigError::Invalid("retriever.k must be positive".into()));
        }
        if self.fetch_k < self.k {
            return Err(ConfigError::Invalid(format!(
                "retriever.fetch_k ({}) must be at least k ({})",
                self.fetch_k, self.k
            )));
        }
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(ConfigError::Invalid(format!(
                "retriever.lambda ({}) must be within [0, 1]",
                self.lambda
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.rag.retriever, RetrieverConfig { k: 3, fetch_k: 6, lambda: 0.5 });
        assert_eq!(config.ingest.max_file_size, 10_485_760);
        assert_eq!(config.ingest.max_files, 10);
        assert_eq!(config.agent.max_iterations, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "llm:\n  model: llama3.2\nrag:\n  retriever:\n    k: 4\n    fetch_k: 8\n",
        )
        .unwrap();

        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.rag.retriever.k, 4);
        assert_eq!(config.rag.retriever.lambda, 0.5);
        assert_eq!(config.rag.chunk_size, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.rag.chunk_overlap = 1000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.rag.retriever.fetch_k = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rag.retriever.lambda = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "agent:\n  max_iterations: 3\nchat:\n  greeting: null\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.agent.max_iterations, 3);
        assert!(config.chat.greeting.is_none());
    }
}
