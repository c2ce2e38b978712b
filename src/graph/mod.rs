// Agentic Graph Module
// LangGraph-style StateGraph architecture for Rust

pub mod builder;
pub mod error;
pub mod node;
pub mod routing;
pub mod runtime;
pub mod state;

pub mod nodes;

pub use builder::build_agentic_graph;
pub use error::WorkflowError;
pub use node::{Node, NodeContext, NodeOutput};
pub use routing::{route_after_grading, Route};
pub use runtime::GraphRuntime;
pub use state::{transition_bound, Degradation, RelevanceDecision, WorkflowState, WorkflowStep};
