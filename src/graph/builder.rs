// Graph Builder
// Constructs the agentic RAG graph using petgraph

use super::error::WorkflowError;
use super::nodes::{GenerateNode, GradeNode, RetrieveNode, RewriteNode};
use super::routing::Route;
use super::runtime::{GraphBuilder, GraphRuntime};
use super::state::{transition_bound, WorkflowStep};
use crate::agentic::MAX_REWRITES_LIMIT;

/// RETRIEVE -> GRADE -> (GENERATE | REWRITE -> RETRIEVE)
pub fn build_agentic_graph() -> Result<GraphRuntime, WorkflowError> {
    use WorkflowStep::{Generate, Grade, Retrieve, Rewrite};

    GraphBuilder::new()
        .entry(Retrieve)
        .max_steps(transition_bound(MAX_REWRITES_LIMIT))
        .node(Box::new(RetrieveNode::new()))
        .node(Box::new(GradeNode::new()))
        .node(Box::new(RewriteNode::new()))
        .node(Box::new(GenerateNode::new()))
        .edge(Retrieve, Grade)
        // Grade edges (conditional routing on relevance and rewrite budget)
        .conditional_edge(Grade, Generate, Route::Generate)
        .conditional_edge(Grade, Rewrite, Route::Rewrite)
        // Loop back for another retrieval
        .edge(Rewrite, Retrieve)
        .build()
}
