//! Engine events: the ordered, externally observable step sequence of a run.

use crate::thread::{Message, ToolCall};
use crate::tool::ToolResult;
use serde::{Deserialize, Serialize};

/// Stable error codes surfaced to stream consumers.
///
/// `CycleExceeded` is distinct so callers can tell an infinite-loop bug from
/// an ordinary failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The reasoning call failed or timed out.
    Inference,
    /// The configured step bound was reached.
    CycleExceeded,
    /// A checkpoint write failed.
    Store,
    /// Anything else.
    Internal,
}

/// Events emitted by a run, totally ordered by node-invocation sequence.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Incremental text produced by the reasoning node.
    TextDelta { delta: String },
    /// A tool call is about to be dispatched.
    ToolCallStart { id: String, name: String },
    /// A tool call finished (success or error-content result).
    ToolCallDone { id: String, result: ToolResult },
    /// A node committed a step: its appended messages are now durable.
    Step {
        node: String,
        delta: Vec<Message>,
        at_ms: u64,
    },
    /// The run reached the terminal node with a final response.
    Done { response: String },
    /// The run aborted.
    Error { code: ErrorCode, message: String },
}

impl AgentEvent {
    /// Whether this event terminates the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done { .. } | AgentEvent::Error { .. })
    }
}

/// Convenience constructor for tool-start events from a call.
impl From<&ToolCall> for AgentEvent {
    fn from(call: &ToolCall) -> Self {
        AgentEvent::ToolCallStart {
            id: call.id.clone(),
            name: call.name.clone(),
        }
    }
}
