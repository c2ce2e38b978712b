// Generate Node
// Terminal state: answers the original question from the last retrieval

use async_trait::async_trait;

use crate::agentic::events::WorkflowEvent;
use crate::graph::error::WorkflowError;
use crate::graph::node::{Node, NodeContext, NodeOutput};
use crate::graph::state::{WorkflowState, WorkflowStep};

pub struct GenerateNode;

impl GenerateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GenerateNode {
    fn step(&self) -> WorkflowStep {
        WorkflowStep::Generate
    }

    fn name(&self) -> &'static str {
        "Generate Answer"
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError> {
        if state.retrieved_documents.is_empty() {
            tracing::info!("No course material retrieved, answering without the model");
        }

        let answer = ctx
            .generator
            .generate(state.original_question(), &state.retrieved_documents)
            .await
            .map_err(|source| WorkflowError::Generation {
                step: WorkflowStep::Generate,
                source,
            })?;

        tracing::info!(
            "Generated {} character answer from {} sources",
            answer.chars().count(),
            state.retrieved_documents.len()
        );
        ctx.events.emit(WorkflowEvent::Answer {
            text: answer.clone(),
        });
        state.final_answer = Some(answer);
        Ok(NodeOutput::Final)
    }
}
