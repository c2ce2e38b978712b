use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::config::{AgenticConfig, RunOptions, MAX_REWRITES_LIMIT};
use super::events::EventSink;
use super::generator::AnswerGenerator;
use super::grader::RelevanceGrader;
use super::rewriter::QueryRewriter;
use crate::graph::state::{Degradation, WorkflowState, WorkflowStep};
use crate::graph::{build_agentic_graph, GraphRuntime, NodeContext, WorkflowError};
use crate::llm::LlmProvider;
use crate::rag::{DocumentStore, RetrievedChunk};

/// Result of one agentic query.
#[derive(Debug, Clone, Serialize)]
pub struct AgenticAnswer {
    pub query_id: Uuid,
    pub question: String,
    /// Query used for the last retrieval.
    pub final_question: String,
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
    pub workflow_path: Vec<WorkflowStep>,
    pub rewrite_count: u32,
    pub was_rewritten: bool,
    pub degradations: Vec<Degradation>,
}

/// Result of a single retrieve-then-generate pass, without grading or rewrites.
#[derive(Debug, Clone, Serialize)]
pub struct DirectAnswer {
    pub query_id: Uuid,
    pub question: String,
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
}

/// Process-wide tally of soft failures, for operators.
#[derive(Debug, Default)]
pub struct DegradationCounters {
    grading: AtomicU64,
    rewrite: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DegradationSnapshot {
    pub grading: u64,
    pub rewrite: u64,
}

impl DegradationCounters {
    pub fn record(&self, degradation: &Degradation) {
        match degradation {
            Degradation::GradingDegraded { .. } => self.grading.fetch_add(1, Ordering::Relaxed),
            Degradation::RewriteDegraded { .. } => self.rewrite.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> DegradationSnapshot {
        DegradationSnapshot {
            grading: self.grading.load(Ordering::Relaxed),
            rewrite: self.rewrite.load(Ordering::Relaxed),
        }
    }
}

pub struct AgenticRagService {
    store: Arc<dyn DocumentStore>,
    grader: RelevanceGrader,
    rewriter: QueryRewriter,
    generator: AnswerGenerator,
    config: AgenticConfig,
    graph: GraphRuntime,
    counters: DegradationCounters,
}

impl AgenticRagService {
    /// All three stages share one model.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn LlmProvider>,
        config: AgenticConfig,
    ) -> Result<Self, WorkflowError> {
        let grader = RelevanceGrader::new(
            llm.clone(),
            config.grading_excerpt_chars,
            config.relevance_fail_open,
        );
        let rewriter = QueryRewriter::new(llm.clone());
        let generator =
            AnswerGenerator::new(llm, config.generation_temperature, config.generation_max_tokens);
        Self::from_stages(store, grader, rewriter, generator, config)
    }

    pub fn from_stages(
        store: Arc<dyn DocumentStore>,
        grader: RelevanceGrader,
        rewriter: QueryRewriter,
        generator: AnswerGenerator,
        config: AgenticConfig,
    ) -> Result<Self, WorkflowError> {
        let graph = build_agentic_graph()?;
        Ok(Self {
            store,
            grader,
            rewriter,
            generator,
            config,
            graph,
            counters: DegradationCounters::default(),
        })
    }

    pub fn degradation_counts(&self) -> DegradationSnapshot {
        self.counters.snapshot()
    }

    /// Retrieves once for the question as asked and generates from whatever came back.
    pub async fn answer_directly(&self, question: &str) -> Result<DirectAnswer, WorkflowError> {
        let query_id = Uuid::new_v4();
        let span = tracing::info_span!("direct_query", %query_id);
        async {
            let question = validate_question(question)?;
            tracing::info!("Direct query: {}", preview(question));

            let sources = self
                .store
                .search(question, self.config.top_k)
                .await
                .map_err(|source| WorkflowError::Retrieval {
                    step: WorkflowStep::Retrieve,
                    source,
                })?;
            let answer = self
                .generator
                .generate(question, &sources)
                .await
                .map_err(|source| WorkflowError::Generation {
                    step: WorkflowStep::Generate,
                    source,
                })?;

            tracing::info!("Direct query answered from {} sources", sources.len());
            Ok(DirectAnswer {
                query_id,
                question: question.to_string(),
                answer,
                sources,
            })
        }
        .instrument(span)
        .await
    }

    /// Answers one question through RETRIEVE → GRADE → [REWRITE → RETRIEVE …] → GENERATE.
    ///
    /// Input is validated before the first transition. Retrieval and model
    /// failures abort the run; grading and rewrite trouble is absorbed and
    /// reported in `degradations`.
    pub async fn run(
        &self,
        question: &str,
        options: RunOptions,
    ) -> Result<AgenticAnswer, WorkflowError> {
        let query_id = Uuid::new_v4();
        let span = tracing::info_span!("agentic_query", %query_id);
        self.run_inner(query_id, question, options)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        query_id: Uuid,
        question: &str,
        options: RunOptions,
    ) -> Result<AgenticAnswer, WorkflowError> {
        let question = validate_question(question)?;

        let max_rewrites = options.max_rewrites.unwrap_or(self.config.max_rewrites);
        if max_rewrites > MAX_REWRITES_LIMIT {
            return Err(WorkflowError::InvalidInput(format!(
                "max_rewrites must be at most {}",
                MAX_REWRITES_LIMIT
            )));
        }

        tracing::info!(
            "Agentic query: {} (max rewrites {})",
            preview(question),
            max_rewrites
        );

        let cancellation = options.cancellation.unwrap_or_default();
        let events = EventSink::new(options.events);
        let ctx = NodeContext {
            store: self.store.as_ref(),
            grader: &self.grader,
            rewriter: &self.rewriter,
            generator: &self.generator,
            config: &self.config,
            events: &events,
            cancellation: &cancellation,
        };

        let mut state = WorkflowState::new(question, max_rewrites);
        let outcome = self.graph.run(&mut state, &ctx).await;

        for degradation in &state.degradations {
            self.counters.record(degradation);
        }

        if let Err(err) = outcome {
            match &err {
                WorkflowError::Cancelled { .. } => tracing::info!("Query abandoned: {}", err),
                _ => tracing::error!(
                    "Agentic query failed after {}: {}",
                    render_path(state.workflow_path()),
                    err
                ),
            }
            return Err(err);
        }

        let answer = state.final_answer.take().ok_or_else(|| {
            WorkflowError::graph("generate", "graph finished without an answer")
        })?;

        tracing::info!(
            "Workflow complete: {} (rewrites {}/{}, {} sources)",
            render_path(state.workflow_path()),
            state.rewrite_count(),
            max_rewrites,
            state.retrieved_documents.len()
        );

        Ok(AgenticAnswer {
            query_id,
            question: state.original_question().to_string(),
            final_question: state.current_question.clone(),
            answer,
            was_rewritten: state.was_rewritten(),
            rewrite_count: state.rewrite_count(),
            workflow_path: state.workflow_path().to_vec(),
            sources: state.retrieved_documents,
            degradations: state.degradations,
        })
    }
}

fn validate_question(question: &str) -> Result<&str, WorkflowError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(WorkflowError::InvalidInput(
            "Question must not be empty".to_string(),
        ));
    }
    Ok(question)
}

fn render_path(path: &[WorkflowStep]) -> String {
    path.iter()
        .map(WorkflowStep::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn preview(text: &str) -> String {
    super::grader::truncate_chars(text, 100)
}
