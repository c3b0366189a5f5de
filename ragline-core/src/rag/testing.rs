//! Scripted provider used by unit tests.

use crate::provider::{GenerateRequest, Provider, ProviderError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// Provider whose embeddings are looked up by substring and whose
/// generation echoes a fixed answer, recording every call.
pub(crate) struct ScriptedProvider {
    /// `(needle, vector)`: the first needle contained in the text wins
    embeddings: Vec<(String, Vec<f32>)>,
    fallback: Vec<f32>,
    answer: String,
    fail_embed: bool,
    fail_generate: bool,
    pub embed_calls: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            embeddings: Vec::new(),
            fallback,
            answer: "scripted answer".to_string(),
            fail_embed: false,
            fail_generate: false,
            embed_calls: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_embedding(mut self, needle: &str, vector: Vec<f32>) -> Self {
        self.embeddings.push((needle.to_string(), vector));
        self
    }

    pub fn with_answer(mut self, answer: &str) -> Self {
        self.answer = answer.to_string();
        self
    }

    pub fn failing_embed(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    pub fn failing_generate(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    pub fn embed_count(&self) -> usize {
        self.embed_calls.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
        self.embed_calls.lock().unwrap().push(text.to_string());
        if self.fail_embed {
            return Err(ProviderError::Api("embedding backend down".to_string()));
        }
        Ok(self
            .embeddings
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt);
        if self.fail_generate {
            return Err(ProviderError::Api("generation backend down".to_string()));
        }
        Ok(self.answer.clone())
    }
}
