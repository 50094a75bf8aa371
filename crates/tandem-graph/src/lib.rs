//! Execution-graph engine for multi-turn tool-using conversations.
//!
//! The engine alternates between a reasoning node (one chat call, possibly
//! streaming) and a tool-execution node (concurrent fan-out over the
//! requested tool calls), routes after every reasoning step, merges each
//! step's messages into durable per-thread state, and exposes the step
//! sequence as an ordered event stream.

#![forbid(unsafe_code)]

pub mod convert;
pub mod definition;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod llm;
pub mod route;
pub mod stream;

pub use definition::{GraphDefinition, NodeKind, Next, AGENT_NODE, END, START, TOOLS_NODE};
pub use engine::{EngineConfig, GraphEngine, RunOutcome};
pub use error::{EngineError, Result};
pub use llm::{GenaiLlmExecutor, LlmEventStream, LlmExecutor, LlmExecutorError};
