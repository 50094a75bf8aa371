//! HTTP routes.

use crate::frames::FrameEncoder;
use crate::service::{ApiError, AppState, ChatRequestBody};
use crate::sse::{sse_frame_stream, sse_response};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tandem_contract::Message;
use tracing::info;

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// Chat endpoint path.
pub const CHAT_PATH: &str = "/v1/chat";
/// Thread list endpoint path.
pub const THREADS_PATH: &str = "/v1/threads";
/// Thread messages endpoint path.
pub const THREAD_MESSAGES_PATH: &str = "/v1/threads/:id/messages";

/// Build health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route(HEALTH_PATH, get(health))
}

/// Build the chat route.
pub fn chat_routes() -> Router<AppState> {
    Router::new().route(CHAT_PATH, post(chat))
}

/// Build read-only thread query routes.
pub fn thread_routes() -> Router<AppState> {
    Router::new()
        .route(THREADS_PATH, get(list_threads))
        .route(THREAD_MESSAGES_PATH, get(get_thread_messages))
}

/// Assemble the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(chat_routes())
        .merge(thread_routes())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn chat(
    State(st): State<AppState>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Response, ApiError> {
    let message = body.message()?.to_string();
    info!(thread_id = %body.thread_id, "chat request");

    let events = st.engine.clone().run_stream(body.thread_id, message);
    let stream = sse_frame_stream(events, FrameEncoder::new());
    Ok(sse_response(stream))
}

#[derive(Debug, Serialize)]
struct ThreadsResponse {
    threads: Vec<String>,
}

async fn list_threads(State(st): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let threads = st
        .read_store
        .list()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(ThreadsResponse { threads }))
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    thread_id: String,
    messages: Vec<Message>,
}

async fn get_thread_messages(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(thread) = st
        .read_store
        .load_thread(&id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    else {
        return Err(ApiError::ThreadNotFound(id));
    };
    Ok(Json(MessagesResponse {
        thread_id: thread.id,
        messages: thread.messages,
    }))
}
