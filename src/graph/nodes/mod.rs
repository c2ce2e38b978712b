// Graph Nodes
// One node per workflow state

mod generate;
mod grade;
mod retrieve;
mod rewrite;

pub use generate::GenerateNode;
pub use grade::GradeNode;
pub use retrieve::RetrieveNode;
pub use rewrite::RewriteNode;

use crate::agentic::events::WorkflowEvent;
use crate::graph::node::NodeContext;
use crate::graph::state::{Degradation, WorkflowState};

/// Soft failures are kept on the state and pushed to listeners.
fn record_degradation(state: &mut WorkflowState, ctx: &NodeContext<'_>, degradation: Degradation) {
    ctx.events.emit(WorkflowEvent::Degraded {
        degradation: degradation.clone(),
    });
    state.degradations.push(degradation);
}
