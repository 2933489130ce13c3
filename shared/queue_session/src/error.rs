use thiserror::Error;

use crate::backend::BackendError;

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Error types for queue operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Neither a queue name nor a queue URL is bound
    #[error("no queue configured: set a queue name or URL")]
    NotConfigured,

    /// Message body was empty
    #[error("message cannot be empty")]
    EmptyMessage,

    /// Queue name could not be resolved to a URL
    #[error("failed to resolve queue URL for {name}: {source}")]
    Resolution {
        /// Queue name that was looked up
        name: String,
        /// Underlying backend failure
        source: BackendError,
    },

    /// Fetch deadline expired before any message was received
    #[error("receive operation timed out")]
    FetchTimeout,

    /// A backend call failed
    #[error("failed to {operation}: {source}")]
    Backend {
        /// Operation that failed, e.g. "send message"
        operation: &'static str,
        /// Underlying backend failure
        source: BackendError,
    },
}

impl QueueError {
    /// Wraps a backend failure with the operation it happened in
    #[must_use]
    pub const fn backend(operation: &'static str, source: BackendError) -> Self {
        Self::Backend { operation, source }
    }
}

/// Errors rejecting a queue reconfiguration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconfigureError {
    /// Neither a queue name nor a queue URL was supplied
    #[error("queue_name or queue_url must be provided")]
    EmptyIdentity,

    /// A backend handle for the new queue could not be built
    #[error("could not reload AWS config: {0}")]
    Connect(BackendError),
}
