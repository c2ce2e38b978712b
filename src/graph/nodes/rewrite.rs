// Rewrite Node
// Reformulates the current question and loops back to RETRIEVE

use async_trait::async_trait;

use super::record_degradation;
use crate::agentic::events::WorkflowEvent;
use crate::graph::error::WorkflowError;
use crate::graph::node::{Node, NodeContext, NodeOutput};
use crate::graph::state::{Degradation, WorkflowState, WorkflowStep};

pub struct RewriteNode;

impl RewriteNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RewriteNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RewriteNode {
    fn step(&self) -> WorkflowStep {
        WorkflowStep::Rewrite
    }

    fn name(&self) -> &'static str {
        "Rewrite Query"
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError> {
        if !state.can_rewrite() {
            return Err(WorkflowError::graph(
                self.id(),
                format!("rewrite budget of {} already spent", state.max_rewrites()),
            ));
        }

        let attempt = state.attempt();
        let previous = state.current_question.clone();
        let rewrite = ctx
            .rewriter
            .rewrite(&previous)
            .await
            .map_err(|source| WorkflowError::Generation {
                step: WorkflowStep::Rewrite,
                source,
            })?;

        if rewrite.fell_back {
            tracing::warn!("Rewriter returned nothing usable, reusing previous query");
            record_degradation(state, ctx, Degradation::RewriteDegraded { attempt });
        } else {
            tracing::info!("Rewrote query: {:?} -> {:?}", previous, rewrite.query);
        }

        ctx.events.emit(WorkflowEvent::Rewritten {
            from: previous,
            to: rewrite.query.clone(),
            attempt,
        });
        state.apply_rewrite(rewrite.query);
        Ok(NodeOutput::Continue)
    }
}
