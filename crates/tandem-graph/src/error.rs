use tandem_contract::{ErrorCode, ThreadStoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that abort a run.
///
/// Tool-level failures are not represented here: they are recovered locally
/// inside the dispatcher as error-content tool results.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The reasoning call failed. No checkpoint is written for the failed
    /// step; the last successful checkpoint remains the durable state.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The configured step bound was reached.
    #[error("max steps ({0}) exceeded")]
    CycleExceeded(usize),

    /// A checkpoint write failed. Never dropped silently: the run is not
    /// complete until a checkpoint succeeds.
    #[error(transparent)]
    Store(#[from] ThreadStoreError),

    /// The graph definition references unknown nodes or cannot terminate.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable error code surfaced to stream consumers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Inference(_) => ErrorCode::Inference,
            Self::CycleExceeded(_) => ErrorCode::CycleExceeded,
            Self::Store(_) => ErrorCode::Store,
            Self::InvalidGraph(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }
}
