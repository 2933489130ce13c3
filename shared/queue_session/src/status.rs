use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::backend::{ApproximateCounts, BackendError};
use crate::error::QueueError;
use crate::session::QueueSession;

/// Connection state of the bound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Attributes were read successfully
    Ok,
    /// No queue is bound, or its URL could not be resolved
    NotConnected,
    /// The queue is resolved but the attribute lookup failed
    Error,
}

/// Point-in-time view of the bound queue
///
/// Counts are the backend's approximate, eventually consistent counters and
/// are zero whenever `status` is not `ok`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueueStatusSnapshot {
    /// Region of the queue, empty when unknown
    pub region: String,
    /// Display name of the queue
    pub queue_name: String,
    /// Resolved queue URL, empty when unresolved
    pub queue_url: String,
    /// Messages available for retrieval
    #[serde(rename = "approximate_number_of_messages")]
    pub approximate_visible: i64,
    /// Messages received but not yet deleted
    #[serde(rename = "approximate_number_of_messages_not_visible")]
    pub approximate_in_flight: i64,
    /// Messages waiting out a delivery delay
    #[serde(rename = "approximate_number_of_messages_delayed")]
    pub approximate_delayed: i64,
    /// Sum of the three counters
    #[serde(rename = "number_of_messages")]
    pub total_approximate: i64,
    /// Connection state
    pub status: QueueStatus,
    /// Human-readable failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueueStatusSnapshot {
    fn for_session(session: &QueueSession) -> Self {
        Self {
            region: session.region(),
            queue_name: session.display_name().to_string(),
            queue_url: session.resolved_url().unwrap_or_default().to_string(),
            approximate_visible: 0,
            approximate_in_flight: 0,
            approximate_delayed: 0,
            total_approximate: 0,
            status: QueueStatus::NotConnected,
            error: None,
        }
    }

    fn with_counts(mut self, counts: ApproximateCounts) -> Self {
        self.approximate_visible = counts.visible;
        self.approximate_in_flight = counts.in_flight;
        self.approximate_delayed = counts.delayed;
        self.total_approximate = counts.total();
        self.status = QueueStatus::Ok;
        self
    }

    fn failed(mut self, status: QueueStatus, error: String) -> Self {
        self.status = status;
        self.error = Some(error);
        self
    }
}

impl QueueSession {
    /// Reports the queue status
    ///
    /// Never fails: an unbound session or an unresolvable name yields
    /// `not_connected`, a failed attribute lookup yields `error`, both with a
    /// detail message. Nothing is cached between calls.
    pub async fn status(&self) -> QueueStatusSnapshot {
        if self.ensure_configured().is_err() {
            return QueueStatusSnapshot::for_session(self)
                .failed(QueueStatus::NotConnected, "no queue configured".to_string());
        }

        let url = match self.endpoint().await {
            Ok(url) => url,
            Err(err) => {
                return QueueStatusSnapshot::for_session(self)
                    .failed(QueueStatus::NotConnected, err.to_string());
            }
        };

        let counts = tokio::time::timeout(
            self.settings().operation_timeout,
            self.backend().approximate_counts(url),
        )
        .await
        .unwrap_or(Err(BackendError::Timeout));

        let snapshot = QueueStatusSnapshot::for_session(self);
        match counts {
            Ok(counts) => snapshot.with_counts(counts),
            Err(source) => {
                let err = QueueError::backend("get queue attributes", source);
                tracing::error!(queue = %self.display_name(), error = %err, "failed to get queue attributes");
                snapshot.failed(QueueStatus::Error, err.to_string())
            }
        }
    }
}
