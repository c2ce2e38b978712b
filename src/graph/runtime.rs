// Graph Runtime - petgraph based
// Executes the agentic workflow as a StateGraph keyed by WorkflowStep

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::error::WorkflowError;
use super::node::{Node, NodeContext, NodeOutput};
use super::routing::Route;
use super::state::{transition_bound, WorkflowState, WorkflowStep};
use crate::agentic::events::WorkflowEvent;

/// Edge condition for graph routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeCondition {
    /// Followed when a node returns `Continue`
    Always,
    /// Followed when a node branches on this route
    OnRoute(Route),
}

impl EdgeCondition {
    fn accepts(&self, output: &NodeOutput) -> bool {
        match (self, output) {
            (EdgeCondition::Always, NodeOutput::Continue) => true,
            (EdgeCondition::OnRoute(expected), NodeOutput::Branch(actual)) => expected == actual,
            _ => false,
        }
    }
}

pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    steps: HashMap<WorkflowStep, NodeIndex>,
    entry: Option<WorkflowStep>,
    /// Hard ceiling on transitions, narrowed per run by the rewrite budget
    max_steps: usize,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            steps: HashMap::new(),
            entry: None,
            max_steps: 50,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn entry(&self) -> Option<WorkflowStep> {
        self.entry
    }

    /// Registers a node under its step; a second node for the same step replaces the lookup.
    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let step = node.step();
        let index = self.graph.add_node(node);
        self.steps.insert(step, index);
        index
    }

    pub fn add_edge(
        &mut self,
        from: WorkflowStep,
        to: WorkflowStep,
        condition: EdgeCondition,
    ) -> Result<(), WorkflowError> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;
        self.graph.add_edge(from_idx, to_idx, condition);
        Ok(())
    }

    pub fn get_node(&self, step: WorkflowStep) -> Option<&dyn Node> {
        self.steps
            .get(&step)
            .and_then(|idx| self.graph.node_weight(*idx))
            .map(|boxed| boxed.as_ref())
    }

    /// Steps that have a node, in insertion order.
    pub fn steps(&self) -> Vec<WorkflowStep> {
        self.graph.node_weights().map(|node| node.step()).collect()
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    fn index_of(&self, step: WorkflowStep) -> Result<NodeIndex, WorkflowError> {
        self.steps.get(&step).copied().ok_or_else(|| {
            WorkflowError::graph(step.node_id(), format!("No node registered for {}", step))
        })
    }

    /// Execute the graph from the entry node until a node returns `Final`.
    ///
    /// Every visited node is appended to the state's workflow path before it
    /// runs. Cancellation is checked before each transition and raced against
    /// the running node.
    pub async fn run(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<(), WorkflowError> {
        let entry = self
            .entry
            .ok_or_else(|| WorkflowError::graph("runtime", "No entry node set"))?;
        let mut current_idx = self.index_of(entry)?;

        let limit = self.max_steps.min(transition_bound(state.max_rewrites()));

        for transition in 0..limit {
            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| WorkflowError::graph("runtime", "Node not found in graph"))?;
            let step = node.step();

            if ctx.cancellation.is_cancelled() {
                tracing::info!("Cancelled before {}", step);
                return Err(WorkflowError::Cancelled { step });
            }

            state.record_step(step);
            ctx.events.emit(WorkflowEvent::StepStarted {
                step,
                attempt: state.attempt(),
            });
            tracing::debug!("Executing node: {} (transition {})", node.name(), transition);

            let output = tokio::select! {
                biased;
                _ = ctx.cancellation.cancelled() => {
                    tracing::info!("Cancelled during {}", step);
                    return Err(WorkflowError::Cancelled { step });
                }
                result = node.execute(state, ctx) => result?,
            };

            if output == NodeOutput::Final {
                tracing::debug!("Graph execution complete at {}", step);
                return Ok(());
            }
            current_idx = self.next_node(current_idx, step, &output)?;
        }

        Err(WorkflowError::graph(
            "runtime",
            format!("Maximum steps ({}) exceeded", limit),
        ))
    }

    fn next_node(
        &self,
        current_idx: NodeIndex,
        step: WorkflowStep,
        output: &NodeOutput,
    ) -> Result<NodeIndex, WorkflowError> {
        self.graph
            .edges_directed(current_idx, Direction::Outgoing)
            .find(|edge| edge.weight().accepts(output))
            .map(|edge| edge.target())
            .ok_or_else(|| {
                WorkflowError::graph(
                    step.node_id(),
                    format!("No outgoing edge from {} for {:?}", step, output),
                )
            })
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently. Edges are resolved in `build`,
/// so nodes may be added after the edges that mention them.
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(WorkflowStep, WorkflowStep, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, step: WorkflowStep) -> Self {
        self.runtime.entry = Some(step);
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: WorkflowStep, to: WorkflowStep) -> Self {
        self.pending_edges.push((from, to, EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(mut self, from: WorkflowStep, to: WorkflowStep, route: Route) -> Self {
        self.pending_edges
            .push((from, to, EdgeCondition::OnRoute(route)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, WorkflowError> {
        if let Some(entry) = self.runtime.entry {
            self.runtime.index_of(entry)?;
        }
        for (from, to, condition) in self.pending_edges {
            self.runtime.add_edge(from, to, condition)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
