//! Parser for the model's ReAct output.
//!
//! Valid output is either
//!
//! ```text
//! Thought: <reasoning>
//! Action: <tool name>
//! Action Input: <input>
//! ```
//!
//! or
//!
//! ```text
//! Thought: I now know the final answer
//! Final Answer: <answer>
//! ```
//!
//! Anything else is a [`ParseError`], which the agent loop turns into a
//! corrective observation.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const FINAL_ANSWER: &str = "Final Answer:";
pub const OBSERVATION: &str = "Observation:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Parsing LLM output produced both a final answer and a parse-able action")]
    AmbiguousFinalAnswer,

    #[error("Invalid Format: Missing 'Action:' after 'Thought:'")]
    MissingAction,

    #[error("Invalid Format: Missing 'Action Input:' after 'Action:'")]
    MissingActionInput,

    #[error("Invalid Format: 'Final Answer:' is empty")]
    EmptyFinalAnswer,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAction {
    pub thought: String,
    pub tool: String,
    pub input: String,
    /// The model output this action was parsed from.
    pub log: String,
}

/// The model's final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFinish {
    pub thought: String,
    pub output: String,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    Action(AgentAction),
    Finish(AgentFinish),
}

fn action_regex() -> &'static Regex {
    static ACTION: OnceLock<Regex> = OnceLock::new();
    ACTION.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("action pattern is valid")
    })
}

fn action_line_regex() -> &'static Regex {
    static ACTION_LINE: OnceLock<Regex> = OnceLock::new();
    ACTION_LINE.get_or_init(|| Regex::new(r"Action\s*\d*\s*:").expect("action line pattern is valid"))
}

/// Drops anything from a hallucinated observation onwards.
///
/// Observations are written by the loop, never by the model.
pub fn truncate_at_observation(text: &str) -> &str {
    match text.find(&format!("\n{}", OBSERVATION)) {
        Some(position) => &text[..position],
        None => text,
    }
}

/// Text before the first marker, without a leading `Thought:` label.
fn thought_before(text: &str, marker_start: usize) -> String {
    let thought = text[..marker_start].trim();
    thought
        .strip_prefix("Thought:")
        .unwrap_or(thought)
        .trim()
        .to_string()
}

pub fn parse(text: &str) -> Result<ParsedOutput, ParseError> {
    let text = truncate_at_observation(text).trim();
    let final_answer_at = text.find(FINAL_ANSWER);

    if let Some(captures) = action_regex().captures(text) {
        if final_answer_at.is_some() {
            return Err(ParseError::AmbiguousFinalAnswer);
        }

        let (Some(whole), Some(tool), Some(input)) = (captures.get(0), captures.get(1), captures.get(2))
        else {
            return Err(ParseError::MissingAction);
        };

        let tool = tool.as_str().trim();
        if tool.is_empty() {
            return Err(ParseError::MissingAction);
        }

        return Ok(ParsedOutput::Action(AgentAction {
            thought: thought_before(text, whole.start()),
            tool: tool.to_string(),
            input: input.as_str().trim().trim_matches('"').to_string(),
            log: text.to_string(),
        }));
    }

    if let Some(position) = final_answer_at {
        let output = text[position + FINAL_ANSWER.len()..].trim();
        if output.is_empty() {
            return Err(ParseError::EmptyFinalAnswer);
        }

        return Ok(ParsedOutput::Finish(AgentFinish {
            thought: thought_before(text, position),
            output: output.to_string(),
            log: text.to_string(),
        }));
    }

    if !action_line_regex().is_match(text) {
        return Err(ParseError::MissingAction);
    }

    Err(ParseError::MissingActionInput)
}
