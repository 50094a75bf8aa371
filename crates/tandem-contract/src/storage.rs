//! Thread persistence contract: durable per-thread state with atomic,
//! versioned checkpoints.

use crate::thread::{add_messages, Message, Thread};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monotonic per-thread version, incremented on every committed delta.
pub type Version = u64;

/// Acknowledgement of a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    pub version: Version,
}

/// A thread together with its current version.
#[derive(Debug, Clone)]
pub struct ThreadHead {
    pub thread: Thread,
    pub version: Version,
}

/// The checkpoint unit: everything one step appended to a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDelta {
    /// The run that produced this delta.
    pub run_id: String,
    /// Name of the node that committed the step.
    pub node: String,
    /// Messages appended by the step, in order.
    pub messages: Vec<Message>,
    /// Commit time, ms since epoch.
    pub at_ms: u64,
}

impl ThreadDelta {
    /// Merge this delta into a thread. Append-only.
    pub fn apply_to(&self, thread: &mut Thread) {
        add_messages(&mut thread.messages, self.messages.clone());
        thread.last_node = Some(self.node.clone());
        thread.updated_at_ms = self.at_ms;
    }
}

/// Thread store errors.
#[derive(Debug, Error)]
pub enum ThreadStoreError {
    #[error("thread not found: {0}")]
    NotFound(String),

    #[error("thread already exists")]
    AlreadyExists,

    #[error("invalid thread id: {0}")]
    InvalidId(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read operations for thread persistence.
#[async_trait]
pub trait ThreadReader: Send + Sync {
    /// Load a thread and its current version.
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadHead>, ThreadStoreError>;

    /// Load a thread without version info. Convenience wrapper.
    async fn load_thread(&self, thread_id: &str) -> Result<Option<Thread>, ThreadStoreError> {
        Ok(self.load(thread_id).await?.map(|h| h.thread))
    }

    /// List all thread IDs.
    async fn list(&self) -> Result<Vec<String>, ThreadStoreError>;

    /// Get total message count for a thread. Convenience wrapper.
    async fn message_count(&self, thread_id: &str) -> Result<usize, ThreadStoreError> {
        let head = self
            .load(thread_id)
            .await?
            .ok_or_else(|| ThreadStoreError::NotFound(thread_id.to_string()))?;
        Ok(head.thread.messages.len())
    }
}

/// Write operations for thread persistence.
#[async_trait]
pub trait ThreadWriter: ThreadReader {
    /// Create a new thread. Returns `AlreadyExists` if the id is taken.
    async fn create(&self, thread: &Thread) -> Result<Committed, ThreadStoreError>;

    /// Append a delta to an existing thread.
    ///
    /// Version is managed internally by the backend — callers do not need to
    /// track it. Each successful append atomically increments the version; a
    /// reader never observes a partially applied delta.
    async fn append(
        &self,
        thread_id: &str,
        delta: &ThreadDelta,
    ) -> Result<Committed, ThreadStoreError>;

    /// Delete a thread. The engine never calls this; retention is external
    /// policy.
    async fn delete(&self, thread_id: &str) -> Result<(), ThreadStoreError>;
}

/// Full thread store capability (read + write).
pub trait ThreadStore: ThreadWriter {}

impl<T: ThreadWriter + ?Sized> ThreadStore for T {}
