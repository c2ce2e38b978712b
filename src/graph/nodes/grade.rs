// Grade Node
// Judges the retrieved batch, then picks GENERATE or REWRITE

use async_trait::async_trait;

use super::record_degradation;
use crate::agentic::events::WorkflowEvent;
use crate::graph::error::WorkflowError;
use crate::graph::node::{Node, NodeContext, NodeOutput};
use crate::graph::routing::{route_after_grading, Route};
use crate::graph::state::{Degradation, RelevanceDecision, WorkflowState, WorkflowStep};

pub struct GradeNode;

impl GradeNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GradeNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GradeNode {
    fn step(&self) -> WorkflowStep {
        WorkflowStep::Grade
    }

    fn name(&self) -> &'static str {
        "Grade Documents"
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError> {
        let attempt = state.attempt();

        if state.retrieved_documents.is_empty() {
            tracing::warn!("No documents to grade");
        }

        let graded = ctx
            .grader
            .grade(&state.current_question, &state.retrieved_documents)
            .await;

        let decision = match graded {
            Ok(verdict) => {
                if let Some(reason) = verdict.fallback_reason {
                    tracing::warn!("Grading degraded: {}, using {:?}", reason, verdict.decision);
                    record_degradation(
                        state,
                        ctx,
                        Degradation::GradingDegraded { attempt, reason },
                    );
                }
                verdict.decision
            }
            Err(err) if ctx.grader.fail_open() => {
                tracing::warn!("Grading call failed, treating documents as relevant: {}", err);
                record_degradation(
                    state,
                    ctx,
                    Degradation::GradingDegraded {
                        attempt,
                        reason: err.to_string(),
                    },
                );
                RelevanceDecision::Relevant
            }
            Err(source) => {
                return Err(WorkflowError::Generation {
                    step: WorkflowStep::Grade,
                    source,
                })
            }
        };

        state.relevance_decision = decision;
        ctx.events.emit(WorkflowEvent::Graded { decision, attempt });

        let route = route_after_grading(state);
        match (route, decision) {
            (Route::Generate, RelevanceDecision::NotRelevant) => tracing::info!(
                "Route -> {} (rewrite budget {} exhausted)",
                route.label(),
                state.max_rewrites()
            ),
            (Route::Generate, _) => {
                tracing::info!("Route -> {} (documents relevant)", route.label())
            }
            (Route::Rewrite, _) => tracing::info!(
                "Route -> {} ({}/{})",
                route.label(),
                state.rewrite_count() + 1,
                state.max_rewrites()
            ),
        }

        Ok(NodeOutput::Branch(route))
    }
}
