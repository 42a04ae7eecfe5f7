//! Per-user session: one conversation, one document index, one agent.

use super::{Conversation, Role};
use crate::agent::{AgentError, AgentOutcome, ReactAgent};
use crate::config::Config;
use crate::provider::Provider;
use crate::rag::{IngestError, IngestPipeline, Ingested, SharedIndex, Upload};
use crate::tools::SearchDocsPlugin;
use docent_plugin::{Plugin, PluginError, PluginRegistry};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Tool registration failed: {0}")]
    Plugin(#[from] PluginError),
}

impl SessionError {
    /// A message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Agent(e) => e.user_message(),
            SessionError::Ingest(IngestError::NoValidDocuments) => {
                "None of the uploaded files could be processed. Please upload PDF or text files.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Bundles the state one user interacts with.
///
/// The retrieval tool is bound to the session's [`SharedIndex`], so
/// [`ingest`](Self::ingest) takes effect on the next question without
/// rebuilding the agent. Questions take `&mut self`, which keeps one agent
/// run at a time per conversation.
///
/// # Examples
///
/// ```no_run
/// use docent_core::{Config, OllamaProvider, Session, Upload};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::load_or_default();
/// let provider = Arc::new(OllamaProvider::from_config(&config.llm));
/// let mut session = Session::new(config, provider)?;
///
/// session.ingest(vec![Upload::from_path("notes.txt")?]).await?;
/// let outcome = session.ask("What do my notes say about X?").await?;
/// println!("{}", outcome.output);
/// # Ok(())
/// # }
/// ```
pub struct Session {
    config: Config,
    conversation: Conversation,
    index: SharedIndex,
    pipeline: IngestPipeline,
    agent: ReactAgent,
}

impl Session {
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> Result<Self> {
        Self::with_tools(config, provider, Vec::new())
    }

    /// Creates a session whose agent can also call `tools`.
    ///
    /// The retrieval tool is always registered first.
    pub fn with_tools(config: Config, provider: Arc<dyn Provider>, tools: Vec<Arc<dyn Plugin>>) -> Result<Self> {
        let index = SharedIndex::new();

        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(SearchDocsPlugin::new(index.clone(), config.rag.retriever)))?;
        for tool in tools {
            registry.register(tool)?;
        }

        let pipeline = IngestPipeline::new(&config.ingest, &config.rag, provider.clone())?;
        let agent = ReactAgent::new(provider, Arc::new(registry), &config.llm, &config.agent);

        let mut conversation = Conversation::new();
        if let Some(greeting) = &config.chat.greeting {
            conversation.append(Role::Assistant, greeting.clone());
        }

        info!(
            tools = ?agent.registry().names(),
            model = %config.llm.model,
            "Session created"
        );

        Ok(Self {
            config,
            conversation,
            index,
            pipeline,
            agent,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn agent(&self) -> &ReactAgent {
        &self.agent
    }

    /// Handle to the session's index slot.
    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    pub async fn has_documents(&self) -> bool {
        self.index.current().await.is_some()
    }

    /// Builds a new index from `uploads` and makes it current.
    ///
    /// On failure the previous index stays in place.
    pub async fn ingest(&mut self, uploads: Vec<Upload>) -> Result<Ingested> {
        let ingested = self.pipeline.process(uploads).await?;
        let previous = self.index.replace(ingested.index.clone()).await;

        info!(
            chunk_count = ingested.chunks.len(),
            skipped = ingested.skipped.len(),
            replaced = previous.is_some(),
            "Document index updated"
        );
        Ok(ingested)
    }

    /// Answers a question and records the exchange in the conversation.
    pub async fn ask(&mut self, question: &str) -> Result<AgentOutcome> {
        Ok(self.agent.run(question, &mut self.conversation).await?)
    }
}
