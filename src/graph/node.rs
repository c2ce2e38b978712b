// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agentic::events::EventSink;
use crate::agentic::{AgenticConfig, AnswerGenerator, QueryRewriter, RelevanceGrader};
use crate::rag::DocumentStore;

use super::error::WorkflowError;
use super::routing::Route;
use super::state::{WorkflowState, WorkflowStep};

/// Collaborators available to nodes during one run
pub struct NodeContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub grader: &'a RelevanceGrader,
    pub rewriter: &'a QueryRewriter,
    pub generator: &'a AnswerGenerator,
    pub config: &'a AgenticConfig,
    /// Progress events for streaming clients
    pub events: &'a EventSink,
    pub cancellation: &'a CancellationToken,
}

/// Output from a node execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutput {
    /// Follow the default edge
    Continue,
    /// Follow the conditional edge for this route
    Branch(Route),
    /// Graph execution complete
    Final,
}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Workflow state this node implements
    fn step(&self) -> WorkflowStep;

    /// Unique identifier for this node
    fn id(&self) -> &'static str {
        self.step().node_id()
    }

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node logic
    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError>;
}
