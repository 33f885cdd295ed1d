//! Catch-all ingest router and serve loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;

use tally_discord::MirrorRunner;
use tally_store::ExecutionStore;

use crate::ingest_request::IngestRequest;

pub struct GatewayState {
    pub store: Arc<ExecutionStore>,
    pub mirror: Arc<MirrorRunner>,
}

/// The endpoint accepts any method on any path; only the headers matter.
pub fn build_ingest_router(state: Arc<GatewayState>) -> Router {
    Router::new().fallback(handle_ingest).with_state(state)
}

/// Binds `bind` and serves the ingest router until ctrl-c.
pub async fn run_ingest_server(bind: &str, state: Arc<GatewayState>) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound ingest server address")?;
    println!(
        "tally ingest server listening: addr={} mirror_ready={}",
        local_addr,
        state.mirror.is_ready()
    );

    let app = build_ingest_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("ingest server exited unexpectedly")
}

async fn handle_ingest(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request = match IngestRequest::from_headers(&headers) {
        Ok(request) => request,
        Err(error) => {
            tracing::debug!(%error, "rejected check-in");
            return (StatusCode::BAD_REQUEST, "Missing required headers");
        }
    };

    let key = request.composite_key();
    if let Err(error) = state.store.record_execution(&key, &request.fields).await {
        // The acknowledgment is owed regardless; the event is recorded in
        // memory and only its persistence failed.
        tracing::error!(%key, %error, "failed to persist execution record");
    }

    let mirror = Arc::clone(&state.mirror);
    tokio::spawn(async move {
        if let Err(error) = mirror
            .mirror(&key, &request.hardware_id, &request.session_id)
            .await
        {
            tracing::warn!(%key, %error, "mirror task failed");
        }
    });

    (StatusCode::OK, "Request received, processing...")
}
