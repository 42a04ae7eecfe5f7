use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{name} is not a valid tool, try one of [{available}].")]
    UnknownTool { name: String, available: String },

    #[error("A tool named '{0}' is already registered")]
    DuplicateName(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, PluginError>;

/// Output from plugin execution.
///
/// `content` is what the reasoning loop shows the model as the observation.
/// `metadata` carries structured data (sources, scores) for callers that
/// want more than text.
#[derive(Debug, Clone)]
pub struct PluginOutput {
    pub content: String,
    pub metadata: Option<Value>,
}

impl PluginOutput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl fmt::Display for PluginOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content)
    }
}

/// Core trait that all tools must implement.
///
/// From the model's perspective a plugin is a named tool it can address in
/// an `Action:` line. The action input is passed through verbatim as text.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier for this plugin.
    /// This is the exact string the model must emit to call it.
    fn name(&self) -> &str;

    /// Human-readable description of what this plugin does.
    /// Included in the prompt to help the model decide when to use it.
    fn description(&self) -> &str;

    /// Execute the plugin with the given action input.
    async fn execute(&self, input: &str) -> Result<PluginOutput>;
}
