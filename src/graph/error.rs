// Workflow errors
// Hard failures surfaced to the caller with the state they happened in

use thiserror::Error;

use super::state::WorkflowStep;
use crate::core::errors::ApiError;
use crate::llm::LlmError;
use crate::rag::StoreError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("retrieval failed during {step}: {source}")]
    Retrieval {
        step: WorkflowStep,
        #[source]
        source: StoreError,
    },
    #[error("model call failed during {step}: {source}")]
    Generation {
        step: WorkflowStep,
        #[source]
        source: LlmError,
    },
    #[error("query cancelled before {step} completed")]
    Cancelled { step: WorkflowStep },
    #[error("graph error in {node}: {message}")]
    Graph { node: String, message: String },
}

impl WorkflowError {
    pub fn graph(node: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowError::Graph {
            node: node.into(),
            message: message.into(),
        }
    }

    /// State the failure is attached to, if any.
    pub fn step(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowError::Retrieval { step, .. }
            | WorkflowError::Generation { step, .. }
            | WorkflowError::Cancelled { step } => Some(*step),
            WorkflowError::InvalidInput(_) | WorkflowError::Graph { .. } => None,
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidInput(msg) => ApiError::BadRequest(msg),
            WorkflowError::Retrieval { .. } => {
                tracing::error!("{}", err);
                ApiError::ServiceUnavailable(
                    "Sorry, I couldn't retrieve course material right now. Please try again."
                        .to_string(),
                )
            }
            WorkflowError::Generation { .. } => {
                tracing::error!("{}", err);
                ApiError::BadGateway(
                    "Sorry, I couldn't generate an answer right now. Please try again."
                        .to_string(),
                )
            }
            WorkflowError::Cancelled { .. } => ApiError::ServiceUnavailable(err.to_string()),
            WorkflowError::Graph { .. } => ApiError::internal(err),
        }
    }
}
