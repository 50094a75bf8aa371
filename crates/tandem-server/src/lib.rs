//! HTTP transport: a chat endpoint streaming frames over SSE, plus
//! read-only thread queries.

#![forbid(unsafe_code)]

pub mod frames;
pub mod http;
pub mod service;
pub mod sse;

pub use frames::{FrameEncoder, StreamFrame};
pub use service::{ApiError, AppState};
