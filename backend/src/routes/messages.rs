use std::sync::Arc;

use axum::{Extension, Json};
use queue_session::{FetchMode, Message, Switchboard};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::types::{AppError, ValidatedJson, ValidatedQuery};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MessagesQuery {
    /// Keep receiving until the queue comes back empty, ignoring single-call mode
    #[serde(default)]
    all: bool,
    /// Batch size per receive call, capped by the configured maximum
    max: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
pub struct SendRequest {
    /// Message body to send
    #[serde(default)]
    #[validate(length(min = 1, message = "message cannot be empty"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct StatusResponse {
    /// Always "ok"
    pub status: String,
    /// Human-readable outcome
    pub message: String,
}

impl StatusResponse {
    fn ok(message: &str) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.to_string(),
        }
    }
}

/// Peeks at the queue
///
/// Received messages are not deleted; they become visible again once their
/// visibility timeout expires. Returns an empty array when the queue is empty.
///
/// # Errors
///
/// - 400 when the query string cannot be parsed
/// - `QueueError::FetchTimeout` - Nothing received before the deadline (504)
/// - `QueueError::Backend` / `QueueError::Resolution` - Backend failure (500)
#[instrument(skip_all, fields(all = query.all, max = ?query.max))]
pub async fn get_messages(
    Extension(switchboard): Extension<Arc<Switchboard>>,
    ValidatedQuery(query): ValidatedQuery<MessagesQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    let mode = if query.all {
        FetchMode::Drain
    } else {
        FetchMode::Configured
    };

    let result = switchboard.current().fetch(mode, query.max).await?;
    if let Some(partial_error) = &result.partial_error {
        tracing::warn!(
            count = result.len(),
            error = %partial_error,
            "returning partial peek result"
        );
    }

    Ok(Json(result.messages))
}

/// Sends a message to the queue
///
/// On FIFO queues the configured message group ID is attached.
///
/// # Errors
///
/// - 400 when the message is missing or empty
/// - `QueueError::Backend` / `QueueError::Resolution` - Backend failure (500)
#[instrument(skip_all)]
pub async fn send_message(
    Extension(switchboard): Extension<Arc<Switchboard>>,
    ValidatedJson(payload): ValidatedJson<SendRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    switchboard.current().send(&payload.message).await?;

    Ok(Json(StatusResponse::ok("message sent successfully")))
}

/// Deletes every message in the queue
///
/// Irreversible; callers are expected to confirm before invoking it.
///
/// # Errors
///
/// - `QueueError::Backend` / `QueueError::Resolution` - Backend failure (500)
#[instrument(skip_all)]
pub async fn purge_queue(
    Extension(switchboard): Extension<Arc<Switchboard>>,
) -> Result<Json<StatusResponse>, AppError> {
    switchboard.current().purge().await?;

    Ok(Json(StatusResponse::ok("queue purged successfully")))
}
