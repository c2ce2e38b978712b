use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::agentic::{AgenticAnswer, DirectAnswer, RunOptions, WorkflowEvent};
use crate::core::errors::ApiError;
use crate::graph::state::{Degradation, WorkflowStep};
use crate::graph::WorkflowError;
use crate::rag::RetrievedChunk;
use crate::state::AppState;

pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub query_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
    pub question: String,
}

impl ChatResponse {
    fn new(answer: DirectAnswer, conversation_id: Option<String>) -> Self {
        Self {
            query_id: answer.query_id,
            conversation_id,
            answer: answer.answer,
            sources: answer.sources,
            question: answer.question,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AgenticChatResponse {
    pub query_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
    pub question: String,
    pub workflow_path: Vec<WorkflowStep>,
    pub rewrites_used: u32,
    pub was_rewritten: bool,
    pub degradations: Vec<Degradation>,
}

impl AgenticChatResponse {
    fn new(answer: AgenticAnswer, conversation_id: Option<String>) -> Self {
        Self {
            query_id: answer.query_id,
            conversation_id,
            answer: answer.answer,
            sources: answer.sources,
            question: answer.question,
            workflow_path: answer.workflow_path,
            rewrites_used: answer.rewrite_count,
            was_rewritten: answer.was_rewritten,
            degradations: answer.degradations,
        }
    }
}

fn validate_message(message: &str) -> Result<(), ApiError> {
    if message.trim().is_empty() {
        return Err(WorkflowError::InvalidInput("Question must not be empty".to_string()).into());
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(())
}

/// Single retrieval and generation, no grading or rewrites.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_message(&payload.message)?;
    tracing::info!(
        "Chat request from conversation {}",
        payload.conversation_id.as_deref().unwrap_or("-")
    );

    let answer = state.agentic.answer_directly(&payload.message).await?;
    Ok(Json(ChatResponse::new(answer, payload.conversation_id)))
}

pub async fn chat_agentic(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_message(&payload.message)?;
    tracing::info!(
        "Agentic chat request from conversation {}",
        payload.conversation_id.as_deref().unwrap_or("-")
    );

    let answer = state
        .agentic
        .run(&payload.message, RunOptions::new())
        .await?;

    Ok(Json(AgenticChatResponse::new(
        answer,
        payload.conversation_id,
    )))
}

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SimpleSummary {
    pub answer: String,
    pub num_sources: usize,
}

#[derive(Debug, Serialize)]
pub struct AgenticSummary {
    pub answer: String,
    pub num_sources: usize,
    pub workflow_path: Vec<WorkflowStep>,
    pub rewrites_used: u32,
    pub was_rewritten: bool,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub question: String,
    pub simple_rag: SimpleSummary,
    pub agentic_rag: AgenticSummary,
}

/// Answers the same question with both pipelines, side by side.
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompareParams>,
) -> Result<impl IntoResponse, ApiError> {
    validate_message(&params.question)?;
    tracing::info!("Comparing simple and agentic answers");

    let (simple, agentic) = tokio::join!(
        state.agentic.answer_directly(&params.question),
        state.agentic.run(&params.question, RunOptions::new()),
    );
    let (simple, agentic) = (simple?, agentic?);

    Ok(Json(CompareResponse {
        question: params.question,
        simple_rag: SimpleSummary {
            num_sources: simple.sources.len(),
            answer: simple.answer,
        },
        agentic_rag: AgenticSummary {
            num_sources: agentic.sources.len(),
            answer: agentic.answer,
            workflow_path: agentic.workflow_path,
            rewrites_used: agentic.rewrite_count,
            was_rewritten: agentic.was_rewritten,
        },
    }))
}

type RunHandle = JoinHandle<Result<AgenticAnswer, WorkflowError>>;

struct EventStream {
    events: UnboundedReceiver<WorkflowEvent>,
    run: Option<RunHandle>,
    conversation_id: Option<String>,
    // Cancels the run when the client goes away and the stream is dropped.
    _cancel_on_drop: DropGuard,
}

/// Streams workflow progress as Server-Sent Events, ending with `result` or `error`.
pub async fn chat_agentic_stream(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    validate_message(&payload.message)?;

    let (sender, events) = mpsc::unbounded_channel();
    let cancellation = CancellationToken::new();
    let options = RunOptions::new()
        .cancellation(cancellation.clone())
        .events(sender);

    let agentic = state.agentic.clone();
    let message = payload.message;
    let run = tokio::spawn(async move { agentic.run(&message, options).await });

    let initial = EventStream {
        events,
        run: Some(run),
        conversation_id: payload.conversation_id,
        _cancel_on_drop: cancellation.drop_guard(),
    };

    let stream = stream::unfold(initial, |mut st| async move {
        if let Some(event) = st.events.recv().await {
            return Some((Ok::<_, Infallible>(workflow_event(&event)), st));
        }

        // Channel closed: the run has finished and dropped its sender.
        let run = st.run.take()?;
        let final_event = match run.await {
            Ok(Ok(answer)) => {
                let response = AgenticChatResponse::new(answer, st.conversation_id.take());
                json_event("result", &response)
            }
            Ok(Err(err)) => error_event(ApiError::from(err)),
            Err(join_err) => error_event(ApiError::internal(join_err)),
        };
        Some((Ok(final_event), st))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn workflow_event(event: &WorkflowEvent) -> Event {
    json_event(event.name(), event)
}

fn error_event(err: ApiError) -> Event {
    if let ApiError::Internal(detail) = &err {
        tracing::error!("Internal error during streamed query: {}", detail);
    }
    json_event(
        "error",
        &json!({
            "status": err.status().as_u16(),
            "error": err.public_message(),
        }),
    )
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    match serde_json::to_string(payload) {
        Ok(data) => Event::default().event(name).data(data),
        Err(err) => {
            tracing::error!("Failed to serialize {} event: {}", name, err);
            Event::default()
                .event("error")
                .data(r#"{"error":"Internal server error"}"#)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_message_is_rejected() {
        let err = validate_message("   ").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn message_length_is_counted_in_chars() {
        let at_limit = "é".repeat(MAX_MESSAGE_CHARS);
        assert!(validate_message(&at_limit).is_ok());

        let over = "a".repeat(MAX_MESSAGE_CHARS + 1);
        let err = validate_message(&over).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
