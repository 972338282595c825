use crate::config::Config;
use anyhow::{Context, Result};
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared state for the bootstrap endpoint
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

/// Thread object returned by the upstream assistant API
#[derive(Debug, Deserialize)]
struct UpstreamThread {
    id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/thread", post(create_thread))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the bootstrap endpoint until the process is stopped
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read bind address")?;
    tracing::info!(%addr, "thread bootstrap endpoint listening");
    axum::serve(listener, router(state))
        .await
        .context("Bootstrap server failed")?;
    Ok(())
}

/// POST /api/thread
///
/// Takes no input; asks the upstream assistant service to allocate a
/// new conversation thread. Every call creates a new thread.
async fn create_thread(State(state): State<AppState>) -> impl IntoResponse {
    match bootstrap_thread(&state).await {
        Ok(thread_id) => (
            StatusCode::OK,
            Json(serde_json::json!({ "threadId": thread_id })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "thread bootstrap failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal server error" })),
            )
        }
    }
}

async fn bootstrap_thread(state: &AppState) -> Result<String> {
    let url = format!(
        "{}/threads",
        state.config.assistant_base_url.trim_end_matches('/')
    );

    let mut request = state
        .client
        .post(&url)
        .header("Content-Type", "application/json")
        .header("OpenAI-Beta", "assistants=v2");
    if let Some(key) = state.config.api_key() {
        request = request.header("Authorization", format!("Bearer {key}"));
    }

    let response = request
        .send()
        .await
        .context("Upstream thread creation request failed")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Upstream assistant API error {status}: {body}");
    }

    let thread: UpstreamThread = response
        .json()
        .await
        .context("Failed to parse upstream thread object")?;
    Ok(thread.id)
}
