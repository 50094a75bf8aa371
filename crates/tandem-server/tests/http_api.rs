//! In-process HTTP API tests over a scripted model.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use genai::chat::{ChatOptions, ChatRequest, ChatStreamEvent, StreamChunk};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tandem_contract::{ThreadReader, ThreadWriter};
use tandem_graph::{
    EngineConfig, GraphDefinition, GraphEngine, LlmEventStream, LlmExecutor, LlmExecutorError,
};
use tandem_server::http::router;
use tandem_server::AppState;
use tandem_store_adapters::MemoryStore;
use tower::ServiceExt;

/// Replays one scripted text response per call.
struct ScriptedLlm {
    replies: Mutex<Vec<Vec<&'static str>>>,
}

#[async_trait]
impl LlmExecutor for ScriptedLlm {
    async fn exec_chat_stream_events(
        &self,
        _model: &str,
        _chat_req: ChatRequest,
        _options: Option<&ChatOptions>,
    ) -> Result<LlmEventStream, LlmExecutorError> {
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(LlmExecutorError::Provider("script exhausted".to_string()));
        }
        let chunks = replies.remove(0);
        let items: Vec<Result<ChatStreamEvent, LlmExecutorError>> = chunks
            .into_iter()
            .map(|c| {
                Ok(ChatStreamEvent::Chunk(StreamChunk {
                    content: c.to_string(),
                }))
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

fn app(replies: Vec<Vec<&'static str>>) -> (axum::Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let llm = Arc::new(ScriptedLlm {
        replies: Mutex::new(replies),
    });
    let engine = Arc::new(GraphEngine::new(
        GraphDefinition::react(),
        llm,
        HashMap::new(),
        store.clone(),
        EngineConfig::new("test-model"),
    ));
    let state = AppState {
        engine,
        read_store: store.clone() as Arc<dyn ThreadReader>,
    };
    (router(state), store)
}

fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app(vec![]);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_streams_text_frames_and_done_marker() {
    let (app, store) = app(vec![vec!["Hel", "lo!"]]);

    let response = app
        .oneshot(chat_request(r#"{"message": "hi", "thread_id": "t1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains(r#"data: {"type":"text","text":"Hel"}"#));
    assert!(text.contains(r#"data: {"type":"text","text":"lo!"}"#));
    assert!(text.contains(r#""type":"final""#));
    assert!(text.ends_with("data: [DONE]\n\n"));

    // The run is durable once the stream completes.
    let thread = store.load_thread("t1").await.unwrap().unwrap();
    assert_eq!(thread.message_count(), 2);
    assert_eq!(thread.messages[1].content, "Hello!");
}

#[tokio::test]
async fn chat_without_message_is_bad_request() {
    let (app, _) = app(vec![]);

    let response = app
        .oneshot(chat_request(r#"{"thread_id": "t1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Message is required");
}

#[tokio::test]
async fn chat_failure_still_terminates_stream() {
    // Empty script: the reasoning call fails immediately.
    let (app, _) = app(vec![]);

    let response = app
        .oneshot(chat_request(r#"{"message": "hi", "thread_id": "t1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains(r#""type":"error""#));
    assert!(text.contains(r#""code":"inference""#));
    assert!(text.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn history_returns_persisted_messages() {
    let (app, _) = app(vec![vec!["Sure."]]);

    let response = app
        .clone()
        .oneshot(chat_request(r#"{"message": "help me", "thread_id": "t9"}"#))
        .await
        .unwrap();
    // Drain the SSE body so the run completes.
    let _ = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/threads/t9/messages")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["thread_id"], "t9");
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "help me");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Sure.");
}

#[tokio::test]
async fn history_for_unknown_thread_is_not_found() {
    let (app, _) = app(vec![]);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/threads/ghost/messages")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn threads_lists_known_ids() {
    let (app, store) = app(vec![]);
    store
        .create(&tandem_contract::Thread::new("t-a"))
        .await
        .unwrap();
    store
        .create(&tandem_contract::Thread::new("t-b"))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/threads")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["threads"], serde_json::json!(["t-a", "t-b"]));
}
