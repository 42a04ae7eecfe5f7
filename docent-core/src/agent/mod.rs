//! ReAct agent loop.
//!
//! The agent drives the model through a small state machine:
//!
//! ```text
//! Thinking ──action──▶ Acting ──▶ Observing ──▶ Thinking
//!    │  └──parse error──────────▶ Observing
//!    └──final answer──▶ Done
//! Observing ──iteration ceiling──▶ Failed
//! ```
//!
//! Every call to the model consumes one iteration. Malformed output and tool
//! failures are fed back to the model as observations, so only the iteration
//! ceiling and an unreachable model end a run with an error.

pub mod parser;
pub mod prompt;

use crate::chat::{Conversation, Role};
use crate::config::{AgentConfig, LlmConfig};
use crate::provider::{ChatRequest, ChatResponse, Message, Provider, ProviderError};
use docent_plugin::PluginRegistry;
use parser::{AgentAction, AgentFinish, ParseError, ParsedOutput};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use parser::parse;

/// Appended to a parse error so the model can correct itself.
pub const FORMAT_REMINDER: &str = "Please follow the format: \
    'Thought: ...' followed by 'Action: <tool name>' and 'Action Input: <input>', \
    or 'Thought: I now know the final answer' followed by 'Final Answer: <answer>'.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Language model unavailable: {0}")]
    OracleUnavailable(#[from] ProviderError),

    #[error("Agent stopped due to iteration limit ({iterations} iterations)")]
    IterationLimitExceeded { iterations: usize },
}

impl AgentError {
    /// A message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::OracleUnavailable(_) => {
                "The language model could not be reached. Please check that the model server is running and try again."
                    .to_string()
            }
            AgentError::IterationLimitExceeded { iterations } => format!(
                "Sorry, I could not determine an answer within {} reasoning steps. Please try rephrasing your question.",
                iterations
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// What the model asked for in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Tool { name: String, input: String },
    /// The output could not be parsed.
    Invalid(ParseError),
}

/// One Thinking → Acting → Observing cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStep {
    pub thought: String,
    pub action: StepAction,
    /// Model output for this step, replayed in the scratchpad.
    pub log: String,
    pub observation: String,
}

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub output: String,
    pub steps: Vec<AgentStep>,
    /// Number of model calls made, including the one that produced the answer.
    pub iterations: usize,
}

enum AgentState {
    Thinking,
    Acting(AgentAction),
    Observing(AgentStep),
    Done(AgentFinish),
    Failed,
}

pub struct ReactAgent {
    provider: Arc<dyn Provider>,
    registry: Arc<PluginRegistry>,
    model: String,
    temperature: f64,
    max_iterations: usize,
}

impl ReactAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<PluginRegistry>,
        llm: &LlmConfig,
        agent: &AgentConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_iterations: agent.max_iterations,
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Answers `question`, recording the exchange in `conversation` on success.
    ///
    /// The conversation is rendered into the prompt as it stood before the
    /// question. On failure the conversation is left untouched.
    pub async fn run(&self, question: &str, conversation: &mut Conversation) -> Result<AgentOutcome> {
        let history = conversation.render();
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut iterations = 0;
        let mut state = AgentState::Thinking;

        info!(question = %question, max_iterations = self.max_iterations, "Agent started");

        loop {
            state = match state {
                AgentState::Thinking => {
                    iterations += 1;
                    debug!(iteration = iterations, "Thinking");

                    let text = self.think(question, &steps, &history).await?;
                    match parser::parse(&text) {
                        Ok(ParsedOutput::Finish(finish)) => AgentState::Done(finish),
                        Ok(ParsedOutput::Action(action)) => AgentState::Acting(action),
                        Err(e) => {
                            warn!(iteration = iterations, error = %e, "Could not parse model output");
                            AgentState::Observing(AgentStep {
                                thought: String::new(),
                                log: parser::truncate_at_observation(&text).trim().to_string(),
                                observation: format!("Could not parse output ({}). {}", e, FORMAT_REMINDER),
                                action: StepAction::Invalid(e),
                            })
                        }
                    }
                }
                AgentState::Acting(action) => {
                    info!(iteration = iterations, tool = %action.tool, input = %action.input, "Executing tool");

                    let observation = match self.registry.execute(&action.tool, &action.input).await {
                        Ok(output) => output.content,
                        Err(e) => {
                            warn!(tool = %action.tool, error = %e, "Tool call failed");
                            e.to_string()
                        }
                    };

                    AgentState::Observing(AgentStep {
                        thought: action.thought,
                        action: StepAction::Tool {
                            name: action.tool,
                            input: action.input,
                        },
                        log: action.log,
                        observation,
                    })
                }
                AgentState::Observing(step) => {
                    debug!(iteration = iterations, observation_len = step.observation.len(), "Observed");
                    steps.push(step);

                    if iterations >= self.max_iterations {
                        AgentState::Failed
                    } else {
                        AgentState::Thinking
                    }
                }
                AgentState::Done(finish) => {
                    info!(iterations, steps = steps.len(), "Agent finished");
                    conversation.append(Role::Human, question);
                    conversation.append(Role::Assistant, finish.output.clone());

                    return Ok(AgentOutcome {
                        output: finish.output,
                        steps,
                        iterations,
                    });
                }
                AgentState::Failed => {
                    warn!(iterations, "Agent hit the iteration limit");
                    return Err(AgentError::IterationLimitExceeded { iterations });
                }
            };
        }
    }

    /// One call to the model. Returns the full (non-streamed) reply.
    async fn think(&self, question: &str, steps: &[AgentStep], history: &str) -> Result<String> {
        let prompt = prompt::render(&self.registry, question, steps, history);
        let request = ChatRequest::new(&self.model, vec![Message::user(prompt)])
            .with_temperature(self.temperature)
            .with_stop(vec![format!("\n{}", parser::OBSERVATION)]);

        let mut reply = String::new();
        self.provider
            .chat(
                request,
                Box::new(|response: ChatResponse| {
                    reply.push_str(&response.content);
                }),
            )
            .await?;

        debug!(reply_len = reply.len(), "Model replied");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::SEARCH_DOCS_TOOL;
    use async_trait::async_trait;
    use docent_plugin::{Plugin, PluginError, PluginOutput};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies with queued outputs and records each request.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.messages[0].content.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn chat<'a>(
            &'a self,
            request: ChatRequest,
            mut callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
        ) -> crate::provider::Result<()> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::Other("script exhausted".to_string()))?;

            let middle = reply.char_indices().nth(reply.chars().count() / 2).map_or(0, |(i, _)| i);
            for (part, done) in [(&reply[..middle], false), (&reply[middle..], true)] {
                callback(ChatResponse {
                    model: request.model.clone(),
                    content: part.to_string(),
                    done,
                });
            }
            Ok(())
        }

        async fn embed(&self, _text: &str, _model: &str) -> crate::provider::Result<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    struct LookupTool {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Plugin for LookupTool {
        fn name(&self) -> &str {
            SEARCH_DOCS_TOOL
        }

        fn description(&self) -> &str {
            "Searches the documents."
        }

        async fn execute(&self, input: &str) -> docent_plugin::Result<PluginOutput> {
            self.calls.lock().unwrap().push(input.to_string());
            if input == "broken" {
                return Err(PluginError::ExecutionFailed("index offline".to_string()));
            }
            Ok(PluginOutput::new("A is the capital of X."))
        }
    }

    fn agent(provider: Arc<ScriptedProvider>) -> (ReactAgent, Arc<LookupTool>) {
        let tool = Arc::new(LookupTool {
            calls: Mutex::new(Vec::new()),
        });
        let mut registry = PluginRegistry::new();
        registry.register(tool.clone()).unwrap();

        let agent = ReactAgent::new(
            provider,
            Arc::new(registry),
            &LlmConfig::default(),
            &AgentConfig::default(),
        );
        (agent, tool)
    }

    #[tokio::test]
    async fn test_answers_after_consulting_documents() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "Thought: I should check the documents.\nAction: search_docs_from_RAG\nAction Input: capital of X",
            "Thought: I now know the final answer\nFinal Answer: The capital of X is A.",
        ]));
        let (agent, tool) = agent(provider.clone());
        let mut conversation = Conversation::new();

        let outcome = agent.run("What is the capital of X?", &mut conversation).await.unwrap();

        assert_eq!(outcome.output, "The capital of X is A.");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].observation, "A is the capital of X.");
        assert_eq!(*tool.calls.lock().unwrap(), vec!["capital of X".to_string()]);

        let prompts = provider.prompts();
        assert!(prompts[1].contains(
            "Question: What is the capital of X?\nThought: I should check the documents.\nAction: search_docs_from_RAG"
        ));
        assert!(prompts[1].contains("Action Input: capital of X\nObservation: A is the capital of X.\nThought: "));
        assert!(!prompts[1].contains("Thought: Thought:"));

        let turns = conversation.all();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::Human);
        assert_eq!(turns[0].content, "What is the capital of X?");
        assert_eq!(turns[1].content, "The capital of X is A.");
    }

    #[tokio::test]
    async fn test_requests_stop_at_observation() {
        let provider = Arc::new(ScriptedProvider::new(&["Final Answer: hi"]));
        let (agent, _) = agent(provider.clone());

        agent.run("hello", &mut Conversation::new()).await.unwrap();

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].stop, Some(vec!["\nObservation:".to_string()]));
        assert_eq!(requests[0].temperature, 0.0);
    }

    #[tokio::test]
    async fn test_malformed_output_exhausts_iterations() {
        let provider = Arc::new(ScriptedProvider::new(&["I am not following the format."; 6]));
        let (agent, tool) = agent(provider.clone());
        let mut conversation = Conversation::new();
        conversation.append(Role::Assistant, "Hello!");

        let err = agent.run("What is the capital of X?", &mut conversation).await.unwrap_err();

        assert!(matches!(err, AgentError::IterationLimitExceeded { iterations: 6 }));
        assert!(err.user_message().contains("could not determine an answer"));
        assert_eq!(provider.prompts().len(), 6);
        assert!(tool.calls.lock().unwrap().is_empty());
        assert_eq!(conversation.len(), 1);

        let last = provider.prompts().pop().unwrap();
        assert_eq!(last.matches("Could not parse output (").count(), 5);
    }

    #[tokio::test]
    async fn test_answer_on_last_allowed_iteration() {
        let mut script = vec!["I am not following the format."; 5];
        script.push("Thought: I now know the final answer\nFinal Answer: A");
        let provider = Arc::new(ScriptedProvider::new(&script));
        let (agent, _) = agent(provider.clone());
        let mut conversation = Conversation::new();

        let outcome = agent.run("capital?", &mut conversation).await.unwrap();

        assert_eq!(outcome.output, "A");
        assert_eq!(outcome.iterations, 6);
        assert_eq!(outcome.steps.len(), 5);
        assert_eq!(provider.prompts().len(), 6);
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_recovers_from_malformed_output() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "The answer is probably A.",
            "Thought: I now know the final answer\nFinal Answer: A",
        ]));
        let (agent, _) = agent(provider.clone());

        let outcome = agent.run("capital?", &mut Conversation::new()).await.unwrap();

        assert_eq!(outcome.output, "A");
        assert_eq!(outcome.steps[0].action, StepAction::Invalid(ParseError::MissingAction));
        assert!(provider.prompts()[1].contains(&format!(
            "Could not parse output ({}). {}",
            ParseError::MissingAction,
            FORMAT_REMINDER
        )));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "Thought: use the web\nAction: web_search\nAction Input: capital of X",
            "Final Answer: A",
        ]));
        let (agent, _) = agent(provider.clone());

        let outcome = agent.run("capital?", &mut Conversation::new()).await.unwrap();

        assert_eq!(
            outcome.steps[0].observation,
            "web_search is not a valid tool, try one of [search_docs_from_RAG]."
        );
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_observation() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "Action: search_docs_from_RAG\nAction Input: broken",
            "Final Answer: I could not search the documents.",
        ]));
        let (agent, _) = agent(provider);

        let outcome = agent.run("capital?", &mut Conversation::new()).await.unwrap();

        assert!(outcome.steps[0].observation.contains("index offline"));
        assert_eq!(outcome.output, "I could not search the documents.");
    }

    #[tokio::test]
    async fn test_unreachable_model_is_hard_failure() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let (agent, _) = agent(provider);
        let mut conversation = Conversation::new();

        let err = agent.run("capital?", &mut conversation).await.unwrap_err();

        assert!(matches!(err, AgentError::OracleUnavailable(_)));
        assert!(conversation.is_empty());
    }

    #[tokio::test]
    async fn test_history_reaches_prompt() {
        let provider = Arc::new(ScriptedProvider::new(&["Final Answer: A", "Final Answer: B"]));
        let (agent, _) = agent(provider.clone());
        let mut conversation = Conversation::new();

        agent.run("first?", &mut conversation).await.unwrap();
        agent.run("second?", &mut conversation).await.unwrap();

        assert_eq!(conversation.len(), 4);
        let prompts = provider.prompts();
        assert!(!prompts[0].contains("Human: first?"));
        assert!(prompts[1].contains("Conversation history:\nHuman: first?\nAI: A"));
    }
}
