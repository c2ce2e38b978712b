//! Agentic RAG: the three model-backed stages and the service that runs
//! them through the workflow graph.

pub mod config;
pub mod events;
pub mod generator;
pub mod grader;
pub mod rewriter;
pub mod service;


pub use config::{AgenticConfig, RunOptions, MAX_REWRITES_LIMIT};
pub use events::{EventSink, WorkflowEvent};
pub use generator::{AnswerGenerator, NO_MATERIAL_ANSWER};
pub use grader::{parse_relevance, GradeVerdict, ParsedRelevance, RelevanceGrader};
pub use rewriter::{QueryRewriter, Rewrite};
pub use service::{
    AgenticAnswer, AgenticRagService, DirectAnswer, DegradationCounters, DegradationSnapshot,
};
