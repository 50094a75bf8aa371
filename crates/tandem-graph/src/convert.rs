//! Pure functions for converting between the domain model and genai types.

use genai::chat::{ChatMessage, ChatRequest, MessageContent, ToolResponse};
use tandem_contract::{Message, Role, Tool, ToolDescriptor, ToolResult};

/// Convert a ToolDescriptor to a genai Tool.
pub fn to_genai_tool(desc: &ToolDescriptor) -> genai::chat::Tool {
    genai::chat::Tool::new(&desc.id)
        .with_description(&desc.description)
        .with_schema(desc.parameters.clone())
}

/// Convert a Message to a genai ChatMessage.
pub fn to_chat_message(msg: &Message) -> ChatMessage {
    match msg.role {
        Role::System => ChatMessage::system(&msg.content),
        Role::User => ChatMessage::user(&msg.content),
        Role::Assistant => {
            if let Some(ref calls) = msg.tool_calls {
                let genai_calls: Vec<genai::chat::ToolCall> = calls
                    .iter()
                    .map(|c| genai::chat::ToolCall {
                        call_id: c.id.clone(),
                        fn_name: c.name.clone(),
                        fn_arguments: c.arguments.clone(),
                        thought_signatures: None,
                    })
                    .collect();

                let mut content = MessageContent::from(msg.content.as_str());
                for call in genai_calls {
                    content.push(genai::chat::ContentPart::ToolCall(call));
                }
                ChatMessage::assistant(content)
            } else {
                ChatMessage::assistant(&msg.content)
            }
        }
        Role::Tool => {
            let call_id = msg.tool_call_id.as_deref().unwrap_or("");
            let response = ToolResponse {
                call_id: call_id.to_string(),
                fn_name: None,
                content: msg.content.clone(),
            };
            ChatMessage::from(response)
        }
    }
}

/// Build a genai ChatRequest from messages and the tool catalog.
pub fn build_request(messages: &[Message], tools: &[&dyn Tool]) -> ChatRequest {
    let chat_messages: Vec<ChatMessage> = messages.iter().map(to_chat_message).collect();

    let genai_tools: Vec<genai::chat::Tool> = tools
        .iter()
        .map(|t| to_genai_tool(&t.descriptor()))
        .collect();

    let mut request = ChatRequest::new(chat_messages);

    if !genai_tools.is_empty() {
        request = request.with_tools(genai_tools);
    }

    request
}

/// Create a tool response message from a ToolResult.
///
/// The whole result is serialized into the message content so the model sees
/// status and error text, not just the payload.
pub fn tool_response(call_id: impl Into<String>, result: &ToolResult) -> Message {
    let content = serde_json::to_string(result)
        .unwrap_or_else(|_| result.message.clone().unwrap_or_default());
    Message::tool(call_id, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tandem_contract::{ToolCall, ToolError};

    struct MockTool;

    #[async_trait]
    impl Tool for MockTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("mock", "Mock Tool", "A mock tool for testing").with_parameters(
                json!({
                    "type": "object",
                    "properties": {
                        "input": { "type": "string" }
                    }
                }),
            )
        }

        async fn execute(&self, _args: Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success("mock", json!({"result": "ok"})))
        }
    }

    #[test]
    fn test_to_genai_tool() {
        let desc = ToolDescriptor::new("calc", "Calculator", "Calculate expressions")
            .with_parameters(json!({"type": "object"}));

        let genai_tool = to_genai_tool(&desc);

        assert_eq!(genai_tool.name.as_str(), "calc");
        assert_eq!(
            genai_tool.description.as_deref(),
            Some("Calculate expressions")
        );
    }

    #[test]
    fn test_to_chat_message_roles_do_not_panic() {
        let _ = to_chat_message(&Message::system("You are helpful."));
        let _ = to_chat_message(&Message::user("Hello"));
        let _ = to_chat_message(&Message::assistant("Hi there"));
        let _ = to_chat_message(&Message::tool("call_1", "Result: 42"));
        let _ = to_chat_message(&Message::assistant_with_tool_calls(
            "Searching...",
            vec![ToolCall::new("call_1", "search", json!({"q": "rust"}))],
        ));
    }

    #[test]
    fn test_build_request_no_tools() {
        let messages = vec![Message::user("Hello"), Message::assistant("Hi!")];

        let request = build_request(&messages, &[]);

        assert_eq!(request.messages.len(), 2);
        assert!(request.tools.is_none());
    }

    #[test]
    fn test_build_request_with_tools() {
        let messages = vec![Message::user("Hello")];
        let mock_tool = MockTool;
        let tools: Vec<&dyn Tool> = vec![&mock_tool];

        let request = build_request(&messages, &tools);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.tools.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_build_request_with_tool_responses() {
        let messages = vec![
            Message::user("Calculate 5*5"),
            Message::assistant_with_tool_calls(
                "I'll calculate that.",
                vec![ToolCall::new("call_1", "calc", json!({"expr": "5*5"}))],
            ),
            Message::tool("call_1", r#"{"result": 25}"#),
            Message::assistant("5*5 equals 25."),
        ];

        let request = build_request(&messages, &[]);
        assert_eq!(request.messages.len(), 4);
    }

    #[test]
    fn test_tool_response_from_success() {
        let result = ToolResult::success("calc", json!({"answer": 42}));
        let msg = tool_response("call_1", &result);

        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(msg.content.contains("42"));
        assert!(msg.content.contains("success"));
    }

    #[test]
    fn test_tool_response_from_error() {
        let result = ToolResult::error("calc", "Division by zero");
        let msg = tool_response("call_err", &result);

        assert_eq!(msg.role, Role::Tool);
        assert!(msg.content.contains("error"));
        assert!(msg.content.contains("Division by zero"));
    }
}
