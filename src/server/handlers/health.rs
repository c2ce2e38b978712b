use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Dependency check: model server, course material store, soft-failure tallies.
pub async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let llm_reachable = match state.llm.health_check().await {
        Ok(reachable) => reachable,
        Err(err) => {
            tracing::warn!("LLM health check failed: {}", err);
            false
        }
    };

    let chunk_count = match state.store.count().await {
        Ok(count) => Some(count),
        Err(err) => {
            tracing::warn!("Document store health check failed: {}", err);
            None
        }
    };

    let status = if llm_reachable && chunk_count.is_some() {
        "ok"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "llm": {
            "provider": state.llm.name(),
            "model": state.config.llm.model,
            "reachable": llm_reachable,
        },
        "store": {
            "chunk_count": chunk_count,
        },
        "degradations": state.agentic.degradation_counts(),
    }))
}
