use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::graph::state::{Degradation, RelevanceDecision, WorkflowStep};

/// Progress of one query, for streaming clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StepStarted {
        step: WorkflowStep,
        attempt: u32,
    },
    Retrieved {
        query: String,
        count: usize,
        top_score: Option<f32>,
    },
    Graded {
        decision: RelevanceDecision,
        attempt: u32,
    },
    Rewritten {
        from: String,
        to: String,
        attempt: u32,
    },
    Degraded {
        degradation: Degradation,
    },
    Answer {
        text: String,
    },
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::StepStarted { .. } => "step_started",
            WorkflowEvent::Retrieved { .. } => "retrieved",
            WorkflowEvent::Graded { .. } => "graded",
            WorkflowEvent::Rewritten { .. } => "rewritten",
            WorkflowEvent::Degraded { .. } => "degraded",
            WorkflowEvent::Answer { .. } => "answer",
        }
    }
}

/// Best-effort event sender. A gone receiver never affects the run.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<WorkflowEvent>>,
}

impl EventSink {
    pub fn new(sender: Option<UnboundedSender<WorkflowEvent>>) -> Self {
        Self { sender }
    }

    pub fn emit(&self, event: WorkflowEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
