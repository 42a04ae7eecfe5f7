//! docent-core - document-grounded question answering
//!
//! Provides the building blocks of a retrieval-augmented assistant:
//! - LLM provider abstraction (Ollama over HTTP)
//! - Document ingestion into an in-memory vector index with an MMR retriever
//! - The `search_docs_from_RAG` retrieval tool
//! - A ReAct agent loop with a bounded iteration budget
//! - Conversation state and the per-user [`Session`]
//!
//! ## Primary API
//!
//! Most callers only need [`Session`]: ingest uploads with
//! [`Session::ingest`], then ask questions with [`Session::ask`].

pub mod agent;
pub mod chat;
pub mod config;
pub mod provider;
pub mod rag;
pub mod tools;

pub use agent::{AgentError, AgentOutcome, AgentStep, ReactAgent, StepAction};
pub use chat::{Conversation, Role, Session, SessionError, Turn};
pub use config::{Config, ConfigError};
pub use provider::{ChatRequest, ChatResponse, Message, OllamaProvider, Provider, ProviderError};
pub use rag::{Chunk, IngestError, IngestPipeline, Ingested, RetrievalResult, SharedIndex, Upload};
pub use tools::{SearchDocsPlugin, SEARCH_DOCS_TOOL};
