//! Streaming response handling for LLM responses.

use genai::chat::ChatStreamEvent;
use serde_json::Value;
use tandem_contract::ToolCall;

/// Partial tool call being collected during streaming.
#[derive(Debug, Clone)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Collector for streaming LLM responses.
///
/// Processes stream events and accumulates text and tool calls. Tool calls
/// are kept in arrival order: the finished result order is the order the
/// model issued the requests, which downstream dispatch relies on.
#[derive(Debug, Default)]
pub struct StreamCollector {
    text: String,
    tool_calls: Vec<PartialToolCall>,
}

impl StreamCollector {
    /// Create a new stream collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, call_id: &str) -> Option<usize> {
        self.tool_calls.iter().position(|p| p.id == call_id)
    }

    /// Process a stream event and optionally return an output event.
    pub fn process(&mut self, event: ChatStreamEvent) -> Option<StreamOutput> {
        match event {
            ChatStreamEvent::Chunk(chunk) => {
                if !chunk.content.is_empty() {
                    self.text.push_str(&chunk.content);
                    return Some(StreamOutput::TextDelta(chunk.content));
                }
                None
            }
            ChatStreamEvent::ToolCallChunk(tool_chunk) => {
                let call_id = tool_chunk.tool_call.call_id.clone();

                let index = match self.position(&call_id) {
                    Some(index) => index,
                    None => {
                        self.tool_calls.push(PartialToolCall {
                            id: call_id.clone(),
                            name: String::new(),
                            arguments: String::new(),
                        });
                        self.tool_calls.len() - 1
                    }
                };
                let partial = &mut self.tool_calls[index];

                // Name arrives once, on the first chunk of a call.
                if !tool_chunk.tool_call.fn_name.is_empty() && partial.name.is_empty() {
                    partial.name = tool_chunk.tool_call.fn_name.clone();
                    return Some(StreamOutput::ToolCallStart {
                        id: call_id,
                        name: partial.name.clone(),
                    });
                }

                let args_str = tool_chunk.tool_call.fn_arguments.to_string();
                if args_str != "null" && !args_str.is_empty() {
                    partial.arguments.push_str(&args_str);
                    return Some(StreamOutput::ToolCallDelta {
                        id: call_id,
                        args_delta: args_str,
                    });
                }

                None
            }
            ChatStreamEvent::End(end) => {
                // Tool calls captured in the end event override partials.
                if let Some(tool_calls) = end.captured_tool_calls() {
                    for tc in tool_calls {
                        let full = PartialToolCall {
                            id: tc.call_id.clone(),
                            name: tc.fn_name.clone(),
                            arguments: tc.fn_arguments.to_string(),
                        };
                        match self.position(&tc.call_id) {
                            Some(index) => self.tool_calls[index] = full,
                            None => self.tool_calls.push(full),
                        }
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Finish collecting and return the final result.
    pub fn finish(self) -> StreamResult {
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .into_iter()
            .map(|p| {
                let arguments = serde_json::from_str(&p.arguments).unwrap_or(Value::Null);
                ToolCall::new(p.id, p.name, arguments)
            })
            .collect();

        StreamResult {
            text: self.text,
            tool_calls,
        }
    }

    /// Get the current accumulated text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Check if any tool calls have been collected.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Output event from stream processing.
#[derive(Debug, Clone)]
pub enum StreamOutput {
    /// Text content delta.
    TextDelta(String),
    /// Tool call started with name.
    ToolCallStart { id: String, name: String },
    /// Tool call arguments delta.
    ToolCallDelta { id: String, args_delta: String },
}

/// Result of stream collection.
#[derive(Debug, Clone)]
pub struct StreamResult {
    /// Accumulated text content.
    pub text: String,
    /// Collected tool calls, in the order the model issued them.
    pub tool_calls: Vec<ToolCall>,
}

impl StreamResult {
    /// Check if tool execution is needed.
    pub fn needs_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
