// Retrieve Node
// Queries the document store with the current question

use async_trait::async_trait;

use crate::agentic::events::WorkflowEvent;
use crate::graph::error::WorkflowError;
use crate::graph::node::{Node, NodeContext, NodeOutput};
use crate::graph::state::{RelevanceDecision, WorkflowState, WorkflowStep};

pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn step(&self) -> WorkflowStep {
        WorkflowStep::Retrieve
    }

    fn name(&self) -> &'static str {
        "Retrieve"
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError> {
        let query = state.current_question.clone();
        let documents = ctx
            .store
            .search(&query, ctx.config.top_k)
            .await
            .map_err(|source| WorkflowError::Retrieval {
                step: WorkflowStep::Retrieve,
                source,
            })?;

        let top_score = documents.first().map(|doc| doc.score);
        tracing::info!(
            "Retrieved {} chunks (attempt {}, top score {:?})",
            documents.len(),
            state.attempt(),
            top_score
        );
        ctx.events.emit(WorkflowEvent::Retrieved {
            query,
            count: documents.len(),
            top_score,
        });

        state.retrieved_documents = documents;
        state.relevance_decision = RelevanceDecision::Unknown;
        Ok(NodeOutput::Continue)
    }
}
