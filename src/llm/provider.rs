use async_trait::async_trait;

use super::error::LlmError;
use super::types::CompletionRequest;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name for logs (e.g. "llama_server")
    fn name(&self) -> &str;

    /// check if the model server is reachable
    async fn health_check(&self) -> Result<bool, LlmError>;

    /// single-shot text completion, no conversation memory
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// embedding model identifier, stored alongside vectors
    fn model(&self) -> &str;

    /// one vector per input, same order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}
