//! The fixed prompt contract between the agent loop and the model.

use super::AgentStep;
use crate::tools::SEARCH_DOCS_TOOL;
use docent_plugin::PluginRegistry;

/// Renders the full prompt for one reasoning step.
///
/// Layout: instructions with the tool list, the format description, the
/// standing instruction to consult the documents first, the question, the
/// scratchpad of this question's earlier steps, and the conversation so far.
pub fn render(registry: &PluginRegistry, question: &str, steps: &[AgentStep], history: &str) -> String {
    let tools = registry
        .all()
        .iter()
        .map(|tool| format!("{}: {}", tool.name(), tool.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let tool_names = registry.names().join(", ");

    let history = if history.is_empty() {
        String::new()
    } else {
        format!("Conversation history:\n{}\n", history)
    };

    format!(
        "Answer the following questions as best you can. You have access to the following tools:\n\
         \n\
         {tools}\n\
         \n\
         Use the following format:\n\
         \n\
         Question: the input question you must answer\n\
         Thought: you should always think about what to do\n\
         Action: the action to take, should be one of [{tool_names}]\n\
         Action Input: the input to the action\n\
         Observation: the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original input question\n\
         \n\
         Always start with the tool called {SEARCH_DOCS_TOOL} to check if the question can be answered \
         from the context provided by the documents.\n\
         If the context is not sufficient, you can use your own knowledge to answer the question \
         or other tools to get the answer.\n\
         \n\
         Begin!\n\
         \n\
         Question: {question}\n\
         {scratchpad}\n\
         \n\
         {history}",
        scratchpad = render_scratchpad(steps),
    )
}

const THOUGHT: &str = "Thought:";

/// Replays earlier steps as `<model output>\nObservation: <result>\nThought: `.
///
/// Each observation already ends with the `Thought: ` cue, so a later step's
/// own leading label is not repeated.
pub fn render_scratchpad(steps: &[AgentStep]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let log = match step.log.strip_prefix(THOUGHT) {
                Some(rest) if i > 0 => rest.trim_start(),
                _ => step.log.as_str(),
            };
            format!("{}\n{} {}\n{} ", log, super::parser::OBSERVATION, step.observation, THOUGHT)
        })
        .collect()
}
