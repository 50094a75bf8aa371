//! Client-visible frames: the external rendering of the engine's event
//! stream.

use serde::{Deserialize, Serialize};
use tandem_contract::{AgentEvent, ErrorCode, ToolStatus};

/// A frame sent to a streaming client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    /// Incremental assistant text, in production order.
    Text { text: String },
    /// A completed tool call. Emitted only when tool frames are enabled.
    Tool {
        id: String,
        tool_name: String,
        status: ToolStatus,
    },
    /// The final assistant response.
    Final { response: String },
    /// The run aborted.
    Error { code: ErrorCode, message: String },
}

/// Maps engine events to client frames.
///
/// Step commits and tool lifecycle events are bookkeeping and suppressed by
/// default; text deltas and the terminal frame always pass through.
#[derive(Debug, Clone, Default)]
pub struct FrameEncoder {
    include_tool_frames: bool,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also surface completed tool calls as `tool` frames.
    #[must_use]
    pub fn with_tool_frames(mut self, include: bool) -> Self {
        self.include_tool_frames = include;
        self
    }

    /// Encode one engine event, `None` for suppressed bookkeeping.
    pub fn encode(&self, event: &AgentEvent) -> Option<StreamFrame> {
        match event {
            AgentEvent::TextDelta { delta } => Some(StreamFrame::Text {
                text: delta.clone(),
            }),
            AgentEvent::ToolCallDone { id, result } if self.include_tool_frames => {
                Some(StreamFrame::Tool {
                    id: id.clone(),
                    tool_name: result.tool_name.clone(),
                    status: result.status,
                })
            }
            AgentEvent::Done { response } => Some(StreamFrame::Final {
                response: response.clone(),
            }),
            AgentEvent::Error { code, message } => Some(StreamFrame::Error {
                code: *code,
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_contract::ToolResult;

    #[test]
    fn test_text_delta_passes_through() {
        let encoder = FrameEncoder::new();
        let frame = encoder
            .encode(&AgentEvent::TextDelta {
                delta: "Hel".to_string(),
            })
            .unwrap();
        assert_eq!(
            frame,
            StreamFrame::Text {
                text: "Hel".to_string()
            }
        );
    }

    #[test]
    fn test_bookkeeping_suppressed_by_default() {
        let encoder = FrameEncoder::new();
        assert!(encoder
            .encode(&AgentEvent::Step {
                node: "agent".to_string(),
                delta: vec![],
                at_ms: 0
            })
            .is_none());
        assert!(encoder
            .encode(&AgentEvent::ToolCallStart {
                id: "c1".to_string(),
                name: "search".to_string()
            })
            .is_none());
        assert!(encoder
            .encode(&AgentEvent::ToolCallDone {
                id: "c1".to_string(),
                result: ToolResult::success("search", serde_json::json!({}))
            })
            .is_none());
    }

    #[test]
    fn test_tool_frames_opt_in() {
        let encoder = FrameEncoder::new().with_tool_frames(true);
        let frame = encoder
            .encode(&AgentEvent::ToolCallDone {
                id: "c1".to_string(),
                result: ToolResult::success("search", serde_json::json!({})),
            })
            .unwrap();
        match frame {
            StreamFrame::Tool { id, tool_name, .. } => {
                assert_eq!(id, "c1");
                assert_eq!(tool_name, "search");
            }
            other => panic!("expected tool frame, got {other:?}"),
        }
    }

    #[test]
    fn test_terminal_frames() {
        let encoder = FrameEncoder::new();
        let done = encoder
            .encode(&AgentEvent::Done {
                response: "bye".to_string(),
            })
            .unwrap();
        assert_eq!(
            done,
            StreamFrame::Final {
                response: "bye".to_string()
            }
        );

        let err = encoder
            .encode(&AgentEvent::Error {
                code: ErrorCode::CycleExceeded,
                message: "max steps (5) exceeded".to_string(),
            })
            .unwrap();
        match err {
            StreamFrame::Error { code, .. } => assert_eq!(code, ErrorCode::CycleExceeded),
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[test]
    fn test_frame_wire_format() {
        let frame = StreamFrame::Text {
            text: "hi".to_string(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"text","text":"hi"}"#);

        let frame = StreamFrame::Error {
            code: ErrorCode::Store,
            message: "disk full".to_string(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""code":"store""#));
    }
}
