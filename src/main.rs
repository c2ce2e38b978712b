use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ai_mentor_backend::core;
use ai_mentor_backend::core::config::AppPaths;
use ai_mentor_backend::server;
use ai_mentor_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    core::logging::init(&paths);
    let state = AppState::initialize_with(paths).await?;

    match state.store.count().await {
        Ok(0) => tracing::warn!("Course material store is empty; answers will say so"),
        Ok(count) => tracing::info!("Course material store holds {} chunks", count),
        Err(err) => tracing::warn!("Failed to count stored chunks: {}", err),
    }

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        "Listening on {} (model {} at {})",
        addr,
        state.config.llm.model,
        state.config.llm.base_url
    );

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
