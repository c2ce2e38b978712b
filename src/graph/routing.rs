// Routing after GRADE

use super::state::{RelevanceDecision, WorkflowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Generate,
    Rewrite,
}

impl Route {
    /// Name used in routing logs.
    pub fn label(&self) -> &'static str {
        match self {
            Route::Generate => "generate",
            Route::Rewrite => "rewrite",
        }
    }
}

/// RELEVANT goes to GENERATE; NOT_RELEVANT rewrites while budget remains,
/// otherwise generation is forced.
pub fn route_after_grading(state: &WorkflowState) -> Route {
    match state.relevance_decision {
        RelevanceDecision::NotRelevant if state.can_rewrite() => Route::Rewrite,
        _ => Route::Generate,
    }
}
