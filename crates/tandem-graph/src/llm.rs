//! Provider-neutral LLM execution boundary.
//!
//! The engine treats the reasoning call as opaque I/O yielding incremental
//! chunks. Production wires [`GenaiLlmExecutor`]; tests script the stream.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use genai::chat::{ChatOptions, ChatRequest, ChatStreamEvent};
use genai::Client;
use std::pin::Pin;
use thiserror::Error;

/// Error crossing the LLM boundary.
#[derive(Debug, Clone, Error)]
pub enum LlmExecutorError {
    #[error("provider error: {0}")]
    Provider(String),
}

/// Stream item type returned by LLM streaming executors.
pub type LlmEventStream =
    Pin<Box<dyn Stream<Item = Result<ChatStreamEvent, LlmExecutorError>> + Send>>;

/// Provider-neutral streaming chat contract consumed by the engine.
#[async_trait]
pub trait LlmExecutor: Send + Sync {
    /// Execute one streaming chat call.
    async fn exec_chat_stream_events(
        &self,
        model: &str,
        chat_req: ChatRequest,
        options: Option<&ChatOptions>,
    ) -> Result<LlmEventStream, LlmExecutorError>;

    /// Stable executor label for debug/telemetry output.
    fn name(&self) -> &'static str {
        "llm_executor"
    }
}

/// [`LlmExecutor`] backed by a `genai` client.
pub struct GenaiLlmExecutor {
    client: Client,
}

impl GenaiLlmExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for GenaiLlmExecutor {
    fn default() -> Self {
        Self::new(Client::default())
    }
}

#[async_trait]
impl LlmExecutor for GenaiLlmExecutor {
    async fn exec_chat_stream_events(
        &self,
        model: &str,
        chat_req: ChatRequest,
        options: Option<&ChatOptions>,
    ) -> Result<LlmEventStream, LlmExecutorError> {
        let response = self
            .client
            .exec_chat_stream(model, chat_req, options)
            .await
            .map_err(|e| LlmExecutorError::Provider(e.to_string()))?;
        let stream = response
            .stream
            .map(|item| item.map_err(|e| LlmExecutorError::Provider(e.to_string())));
        Ok(Box::pin(stream))
    }

    fn name(&self) -> &'static str {
        "genai"
    }
}
