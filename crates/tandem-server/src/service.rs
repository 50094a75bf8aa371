//! Shared server state and API error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tandem_contract::ThreadReader;
use tandem_graph::GraphEngine;
use thiserror::Error;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GraphEngine>,
    pub read_store: Arc<dyn ThreadReader>,
}

/// API errors with their HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Message is required")]
    MessageRequired,

    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MessageRequired => StatusCode::BAD_REQUEST,
            Self::ThreadNotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn default_thread_id() -> String {
    "default".to_string()
}

/// Body of `POST /v1/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
}

impl ChatRequestBody {
    /// The validated, non-empty user message.
    pub fn message(&self) -> Result<&str, ApiError> {
        match self.message.as_deref() {
            Some(msg) if !msg.trim().is_empty() => Ok(msg),
            _ => Err(ApiError::MessageRequired),
        }
    }
}
