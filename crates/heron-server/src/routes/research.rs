use crate::state::AppState;
use axum::{
    extract::State,
    http::{self, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use heron::orchestrator::{FinalAnswer, Notice, Orchestrator, ResearchRequest};
use heron::providers::factory;
use heron::research::tavily::TavilyClient;
use serde_json::Value;
use std::{
    convert::Infallible,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Server-sent-events response: one `data:` frame per JSON notice.
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
            .unwrap()
    }
}

fn frame(notice: &Notice) -> Result<String, serde_json::Error> {
    Ok(format!("data: {}\n\n", serde_json::to_string(notice)?))
}

fn build_orchestrator(state: &AppState) -> anyhow::Result<Orchestrator> {
    let provider = factory::get_provider(state.provider_config.clone())?;
    let search = Arc::new(TavilyClient::new(state.tavily_config.clone())?);
    Ok(Orchestrator::new(provider, search))
}

/// Streaming research boundary: accepts `{"query": ...}` (optionally with a
/// `session_id`) or a bare string, and streams progress notices until the
/// session reaches `completed` or `error`.
async fn invocations_handler(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<SseResponse, StatusCode> {
    let request = ResearchRequest::from_value(&payload);

    let orchestrator = build_orchestrator(&state).map_err(|e| {
        tracing::error!("Failed to construct research session: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    tokio::spawn(async move {
        let mut notices = orchestrator.run(request);
        while let Some(notice) = notices.next().await {
            let event = match frame(&notice) {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!("Failed to encode notice: {}", e);
                    break;
                }
            };
            // A send failure means the client went away; stop the session
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    Ok(SseResponse::new(stream))
}

/// Non-streaming variant: runs the session to completion and returns the
/// final answer as JSON.
async fn research_handler(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<FinalAnswer>, (StatusCode, String)> {
    let request = ResearchRequest::from_value(&payload);

    let orchestrator = build_orchestrator(&state).map_err(|e| {
        tracing::error!("Failed to construct research session: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let mut notices = orchestrator.run(request);
    while let Some(notice) = notices.next().await {
        match notice {
            Notice::Completed {
                formatted_response,
                tools_used,
                tool_count,
                session_id,
                ..
            } => {
                return Ok(Json(FinalAnswer {
                    formatted_response,
                    tools_used,
                    tool_count,
                    session_id,
                }));
            }
            Notice::Error { error, example, .. } => {
                // Validation errors carry an example payload
                let status = if example.is_some() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                return Err((status, error));
            }
            _ => {}
        }
    }

    Err((
        StatusCode::INTERNAL_SERVER_ERROR,
        "research ended without a result".to_string(),
    ))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/invocations", post(invocations_handler))
        .route("/research", post(research_handler))
        .with_state(state)
}
