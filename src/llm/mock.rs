use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::LlmError;
use super::provider::{Embedder, LlmProvider};
use super::types::CompletionRequest;

/// Replays scripted completions in order, then repeats `fallback`.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn sequence(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|req| req.prompt.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn unavailable() -> LlmError {
    LlmError::Status {
        endpoint: "/v1/completions".to_string(),
        status: 503,
        body: "model is loading".to_string(),
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        Ok(self.fallback.is_some())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(text) => Ok(text.clone()),
            None => Err(unavailable()),
        }
    }
}

/// Deterministic embedder: counts of a few keywords, enough to rank test chunks.
pub struct KeywordEmbedder {
    pub keywords: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&'static str]) -> Self {
        Self {
            keywords: keywords.to_vec(),
        }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .map(|kw| lower.matches(kw).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model(&self) -> &str {
        "keyword-test"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(inputs.iter().map(|text| self.vector_for(text)).collect())
    }
}
