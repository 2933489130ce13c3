//! Queue session management for the SQS console
//!
//! This crate binds the service to a single SQS queue: it resolves the queue
//! identity, aggregates receive calls into one peek result, reports queue
//! status and lets the active queue be swapped at runtime.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Backend seam used by every queue operation
pub mod backend;
/// Error types for queue operations
pub mod error;
/// Batched receive aggregation
pub mod fetch;
/// Queue identity and resolution
pub mod identity;
/// The long-lived queue binding
pub mod session;
/// AWS SQS implementation of the backend seam
pub mod sqs;
/// Queue status snapshots
pub mod status;
/// Runtime replacement of the active session
pub mod switchboard;

/// In-memory backend for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::{
    ApproximateCounts, BackendConnector, BackendError, BackendResult, Message, OutgoingMessage,
    QueueBackend, ReceiveRequest,
};
pub use error::{QueueError, QueueResult, ReconfigureError};
pub use fetch::{FetchMode, FetchOptions, FetchResult};
pub use identity::{is_fifo_queue, QueueIdentity, Resolution};
pub use session::{QueueSession, SessionSettings};
pub use sqs::{SqsBackend, SqsConnector};
pub use status::{QueueStatus, QueueStatusSnapshot};
pub use switchboard::Switchboard;
