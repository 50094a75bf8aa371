//! Conversation model: messages, threads, and the append-only reducer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Optional metadata associating a message with a run and step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// The run that produced this message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Step (round) index within the run (0-based).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<u32>,
}

/// Generate a time-ordered UUID v7 message identifier.
fn gen_message_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Stable message identifier (UUID v7, auto-generated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    pub content: String,
    /// Tool calls made by the assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Tool call ID this message responds to (for tool role).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Optional run/step association metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: Some(gen_message_id()),
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            metadata: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Some(gen_message_id()),
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            metadata: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Some(gen_message_id()),
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            metadata: None,
        }
    }

    /// Create an assistant message with tool calls.
    pub fn assistant_with_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            id: Some(gen_message_id()),
            role: Role::Assistant,
            content: content.into(),
            tool_calls: if calls.is_empty() { None } else { Some(calls) },
            tool_call_id: None,
            metadata: None,
        }
    }

    /// Create a tool response message.
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Some(gen_message_id()),
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
            metadata: None,
        }
    }

    /// Attach run/step metadata to this message.
    #[must_use]
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Tool calls carried by this message, empty slice when none.
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call.
    pub id: String,
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool as JSON.
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Append `incoming` to `existing`, preserving order.
///
/// This is the only way conversation state grows: no reordering, no
/// deduplication, and identity when `incoming` is empty. Applying the same
/// non-empty batch twice appends two copies.
pub fn add_messages(existing: &mut Vec<Message>, incoming: Vec<Message>) {
    existing.extend(incoming);
}

/// One persistent conversation, owned by a single thread id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// External thread identifier.
    pub id: String,
    /// Ordered message sequence. Append-only within a run.
    pub messages: Vec<Message>,
    /// Name of the last node that committed a step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_node: Option<String>,
    /// Creation time, ms since epoch.
    pub created_at_ms: u64,
    /// Last checkpoint time, ms since epoch.
    pub updated_at_ms: u64,
}

impl Thread {
    /// Create an empty thread.
    pub fn new(id: impl Into<String>) -> Self {
        let at = now_ms();
        Self {
            id: id.into(),
            messages: Vec::new(),
            last_node: None,
            created_at_ms: at,
            updated_at_ms: at,
        }
    }

    /// Append a single message.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Number of messages in the thread.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// The last message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_message() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.id.is_some());
        assert!(msg.tool_calls.is_none());
        assert!(msg.tool_call_id.is_none());
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn test_all_constructors_generate_uuid_v7_id() {
        let msgs = vec![
            Message::system("sys"),
            Message::user("usr"),
            Message::assistant("asst"),
            Message::assistant_with_tool_calls("tc", vec![]),
            Message::tool("c1", "result"),
        ];
        for msg in &msgs {
            let id = msg.id.as_ref().expect("message should have an id");
            // UUID v7 format: 8-4-4-4-12 hex chars
            assert_eq!(id.len(), 36, "id should be UUID format: {}", id);
            assert_eq!(&id[14..15], "7", "UUID version should be 7: {}", id);
        }
        let ids: std::collections::HashSet<&str> =
            msgs.iter().map(|m| m.id.as_deref().unwrap()).collect();
        assert_eq!(ids.len(), msgs.len());
    }

    #[test]
    fn test_assistant_with_tool_calls() {
        let calls = vec![ToolCall::new("call_1", "search", json!({"query": "rust"}))];
        let msg = Message::assistant_with_tool_calls("Let me search", calls);

        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Let me search");
        assert_eq!(msg.tool_calls().len(), 1);
    }

    #[test]
    fn test_assistant_with_empty_tool_calls_is_plain() {
        let msg = Message::assistant_with_tool_calls("done", vec![]);
        assert!(msg.tool_calls.is_none());
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn test_tool_message() {
        let msg = Message::tool("call_1", "Result: 42");

        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.content, "Result: 42");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_message_serialization_omits_empty_fields() {
        let msg = Message::user("test");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn test_message_with_metadata_roundtrip() {
        let msg = Message::user("test").with_metadata(MessageMetadata {
            run_id: Some("run-1".to_string()),
            step_index: Some(3),
        });
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        let meta = parsed.metadata.unwrap();
        assert_eq!(meta.run_id.as_deref(), Some("run-1"));
        assert_eq!(meta.step_index, Some(3));
    }

    #[test]
    fn test_add_messages_appends_in_order() {
        let mut state = vec![Message::user("a")];
        add_messages(
            &mut state,
            vec![Message::assistant("b"), Message::tool("c1", "c")],
        );
        assert_eq!(state.len(), 3);
        assert_eq!(state[0].content, "a");
        assert_eq!(state[1].content, "b");
        assert_eq!(state[2].content, "c");
    }

    #[test]
    fn test_add_messages_identity_on_empty() {
        let mut state = vec![Message::user("a"), Message::assistant("b")];
        let before: Vec<String> = state.iter().map(|m| m.content.clone()).collect();
        add_messages(&mut state, vec![]);
        let after: Vec<String> = state.iter().map(|m| m.content.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_add_messages_not_idempotent() {
        let mut state = Vec::new();
        let batch = vec![Message::user("again")];
        add_messages(&mut state, batch.clone());
        add_messages(&mut state, batch);
        assert_eq!(state.len(), 2);
        assert_eq!(state[0].content, "again");
        assert_eq!(state[1].content, "again");
    }

    #[test]
    fn test_thread_new_and_with_message() {
        let thread = Thread::new("t1")
            .with_message(Message::user("hi"))
            .with_message(Message::assistant("hello"));
        assert_eq!(thread.id, "t1");
        assert_eq!(thread.message_count(), 2);
        assert_eq!(thread.last_message().unwrap().role, Role::Assistant);
    }

    #[test]
    fn test_thread_serialization_roundtrip() {
        let thread = Thread::new("t1").with_message(Message::user("hi"));
        let json = serde_json::to_string(&thread).unwrap();
        let parsed: Thread = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "t1");
        assert_eq!(parsed.message_count(), 1);
    }
}
