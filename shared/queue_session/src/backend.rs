use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::QueueIdentity;

/// Result type alias for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a queue backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The call did not complete within its deadline
    #[error("operation timed out")]
    Timeout,

    /// The named queue does not exist or is not visible to the caller
    #[error("queue does not exist: {0}")]
    QueueDoesNotExist(String),

    /// Any other service or transport failure
    #[error("{0}")]
    Service(String),
}

/// A message as returned by a receive call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    /// Backend-assigned message ID
    #[serde(rename = "MessageId")]
    pub id: String,
    /// Raw message body
    #[serde(rename = "Body")]
    pub body: String,
}

/// A message to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Raw message body
    pub body: String,
    /// Message group ID, required by FIFO queues
    pub group_id: Option<String>,
}

/// Parameters for a single receive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveRequest {
    /// Maximum number of messages to return (1-10)
    pub max_messages: i32,
    /// Seconds a received message stays hidden from other receivers
    pub visibility_timeout_seconds: i32,
    /// Long-poll wait hint in seconds (0 = short poll)
    pub wait_time_seconds: i32,
}

/// Approximate message counters reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApproximateCounts {
    /// Messages available for retrieval
    pub visible: i64,
    /// Messages received but not yet deleted
    pub in_flight: i64,
    /// Messages not yet available because of a delivery delay
    pub delayed: i64,
}

impl ApproximateCounts {
    /// Sum of the three counters
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.visible + self.in_flight + self.delayed
    }
}

/// Operations the queue session needs from a message queue service
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Region the backend client is configured for, if known
    fn region(&self) -> Option<String>;

    /// Looks up the URL of a queue by name
    async fn queue_url(&self, name: &str) -> BackendResult<String>;

    /// Sends a message and returns its ID
    async fn send_message(&self, queue_url: &str, message: OutgoingMessage)
        -> BackendResult<String>;

    /// Performs one receive call
    async fn receive_messages(
        &self,
        queue_url: &str,
        request: &ReceiveRequest,
    ) -> BackendResult<Vec<Message>>;

    /// Deletes every message in the queue
    async fn purge(&self, queue_url: &str) -> BackendResult<()>;

    /// Reads the approximate visible, in-flight and delayed counters
    async fn approximate_counts(&self, queue_url: &str) -> BackendResult<ApproximateCounts>;
}

/// Builds fresh backend handles, used when the active queue is replaced
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Creates a backend handle suitable for the given identity
    async fn connect(&self, identity: &QueueIdentity) -> BackendResult<Arc<dyn QueueBackend>>;
}
