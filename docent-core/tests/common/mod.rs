#![allow(dead_code)]

use async_trait::async_trait;
use docent_core::config::Config;
use docent_core::provider::{ChatRequest, ChatResponse, Provider, ProviderError, Result};
use docent_core::Upload;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const DIMENSION: usize = 64;

/// Replays queued model replies and embeds text as a hashed bag of words.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues replies for the next model calls.
    pub fn script<I, S>(&self, replies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies.lock().unwrap().extend(replies.into_iter().map(Into::into));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat<'a>(
        &'a self,
        request: ChatRequest,
        mut callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
    ) -> Result<()> {
        let prompt = request
            .messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::Other("no scripted reply left".to_string()))?;

        callback(ChatResponse {
            model: request.model,
            content: reply,
            done: true,
        });
        Ok(())
    }

    async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
        Ok(bag_of_words(text))
    }
}

/// FNV-1a hash of each lowercase word, folded into a fixed-size vector.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf29ce484222325u64, |hash, byte| {
                (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
            });
        vector[(hash % DIMENSION as u64) as usize] += 1.0;
    }
    // Keep every vector non-zero so cosine similarity stays defined.
    vector[0] += 0.01;
    vector
}

pub fn text_upload(name: &str, text: &str) -> Upload {
    Upload::from_bytes(name, "text/plain", text.as_bytes().to_vec())
}

pub fn action(tool: &str, input: &str) -> String {
    format!("Thought: I should check the documents.\nAction: {}\nAction Input: {}", tool, input)
}

pub fn final_answer(answer: &str) -> String {
    format!("Thought: I now know the final answer\nFinal Answer: {}", answer)
}

/// Defaults with a small splitter so short fixtures produce several chunks.
pub fn small_chunk_config() -> Config {
    let mut config = Config::default();
    config.rag.chunk_size = 60;
    config.rag.chunk_overlap = 10;
    config
}
