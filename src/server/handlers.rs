// HTTP request handlers

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::AppState;
use crate::chat::{ChatError, ConversationMessage, DATA_STREAM_HEADER, DATA_STREAM_VERSION};
use crate::instruction::opener_prompt;

/// Create the router with all endpoints and layers
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.body_limit_bytes;

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/portfolios/:key/opener", get(handle_opener))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// POST /chat - stream an answer grounded on one portfolio
pub async fn handle_chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ChatError> {
    let stream = state.controller.handle(&body).await?;
    tracing::debug!(message_id = stream.message_id(), "Streaming chat response");

    let frames = stream.map(|event| Ok::<_, Infallible>(event.to_frame()));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static(DATA_STREAM_HEADER), DATA_STREAM_VERSION),
        ],
        Body::from_stream(frames),
    )
        .into_response())
}

/// GET /portfolios/:key/opener - the first message a visitor's chat sends
pub async fn handle_opener(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<ConversationMessage>, ChatError> {
    let resolved = state.controller.resolve(&key).await?;
    Ok(Json(ConversationMessage::user(opener_prompt(
        &resolved.portfolio.name,
    ))))
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "provider": state.controller.provider_name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::InvalidRequest { .. } | ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::NotFound { .. } => StatusCode::NOT_FOUND,
            ChatError::Store(_) => StatusCode::BAD_GATEWAY,
            ChatError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };

        if status.is_server_error() {
            tracing::warn!(error = %self, "Chat request failed");
        } else {
            tracing::debug!(error = %self, "Chat request rejected");
        }

        let body = json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
