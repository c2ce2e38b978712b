use thiserror::Error;

use crate::core::errors::ApiError;
use crate::graph::WorkflowError;
use crate::llm::LlmError;
use crate::rag::StoreError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] ApiError),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[source] LlmError),

    #[error("Failed to initialize document store: {0}")]
    Store(#[source] StoreError),

    #[error("Failed to build agentic graph: {0}")]
    Graph(#[source] WorkflowError),
}
