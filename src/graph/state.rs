// Workflow State
// The per-query record threaded through the agentic graph

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rag::RetrievedChunk;

/// States of the agentic loop. RETRIEVE is the entry, GENERATE the only exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowStep {
    Retrieve,
    Grade,
    Rewrite,
    Generate,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Retrieve => "RETRIEVE",
            WorkflowStep::Grade => "GRADE",
            WorkflowStep::Rewrite => "REWRITE",
            WorkflowStep::Generate => "GENERATE",
        }
    }

    /// Graph node id for this step.
    pub fn node_id(&self) -> &'static str {
        match self {
            WorkflowStep::Retrieve => "retrieve",
            WorkflowStep::Grade => "grade",
            WorkflowStep::Rewrite => "rewrite",
            WorkflowStep::Generate => "generate",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelevanceDecision {
    #[default]
    Unknown,
    Relevant,
    NotRelevant,
}

/// Soft failure absorbed by the loop. The query still succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Grading call failed or its output could not be parsed; documents were kept.
    GradingDegraded { attempt: u32, reason: String },
    /// Rewriter produced nothing usable; the previous query was reused.
    RewriteDegraded { attempt: u32 },
}

/// Upper bound on transitions for one query: a retrieve/grade pair per
/// attempt, a rewrite between attempts and one generate.
pub fn transition_bound(max_rewrites: u32) -> usize {
    2 + 3 * (max_rewrites as usize + 1)
}

#[derive(Debug, Clone)]
pub struct WorkflowState {
    original_question: String,
    pub current_question: String,
    /// Replaced, never appended, on every retrieval.
    pub retrieved_documents: Vec<RetrievedChunk>,
    pub relevance_decision: RelevanceDecision,
    rewrite_count: u32,
    max_rewrites: u32,
    pub final_answer: Option<String>,
    workflow_path: Vec<WorkflowStep>,
    pub degradations: Vec<Degradation>,
}

impl WorkflowState {
    pub fn new(question: impl Into<String>, max_rewrites: u32) -> Self {
        let question = question.into();
        Self {
            current_question: question.clone(),
            original_question: question,
            retrieved_documents: Vec::new(),
            relevance_decision: RelevanceDecision::Unknown,
            rewrite_count: 0,
            max_rewrites,
            final_answer: None,
            workflow_path: Vec::new(),
            degradations: Vec::new(),
        }
    }

    pub fn original_question(&self) -> &str {
        &self.original_question
    }

    pub fn rewrite_count(&self) -> u32 {
        self.rewrite_count
    }

    pub fn max_rewrites(&self) -> u32 {
        self.max_rewrites
    }

    pub fn workflow_path(&self) -> &[WorkflowStep] {
        &self.workflow_path
    }

    /// 1-based retrieval attempt currently in progress.
    pub fn attempt(&self) -> u32 {
        self.rewrite_count + 1
    }

    pub fn can_rewrite(&self) -> bool {
        self.rewrite_count < self.max_rewrites
    }

    pub(crate) fn record_step(&mut self, step: WorkflowStep) {
        self.workflow_path.push(step);
    }

    /// Installs the next retrieval query. Counts the rewrite even when the
    /// query is unchanged.
    pub(crate) fn apply_rewrite(&mut self, next_query: String) {
        self.current_question = next_query;
        self.rewrite_count += 1;
    }

    pub fn was_rewritten(&self) -> bool {
        self.rewrite_count > 0
    }
}
