use std::sync::Arc;

use axum::{Extension, Json};
use queue_session::{QueueIdentity, Switchboard};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::{Validate, ValidationError};

use crate::types::{AppError, ValidatedJson};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_identity"))]
pub struct QueueConfigRequest {
    /// Queue name, resolved to a URL through the backend
    #[serde(default)]
    pub queue_name: String,
    /// Queue URL, used as-is when set
    #[serde(default)]
    pub queue_url: String,
}

fn validate_identity(request: &QueueConfigRequest) -> Result<(), ValidationError> {
    if request.queue_name.trim().is_empty() && request.queue_url.trim().is_empty() {
        return Err(ValidationError::new("empty_identity")
            .with_message("queue_name or queue_url must be provided".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct QueueConfigResponse {
    /// Always "ok"
    pub status: String,
    /// Display name of the new queue
    pub queue_name: String,
    /// Resolved URL of the new queue, empty when not yet resolved
    pub queue_url: String,
    /// Whether the new queue URL was resolved
    pub reconnected: bool,
}

/// Switches the service to another queue
///
/// The new session replaces the active one only after its backend handle was
/// built. A queue name that cannot be resolved yet is still installed and
/// reported with `reconnected: false`; the lookup is retried on the next
/// operation.
///
/// # Errors
///
/// - 400 when both `queue_name` and `queue_url` are empty
/// - `ReconfigureError::Connect` - AWS config could not be reloaded (503)
#[instrument(skip_all, fields(queue_name = %payload.queue_name, queue_url = %payload.queue_url))]
pub async fn update_queue(
    Extension(switchboard): Extension<Arc<Switchboard>>,
    ValidatedJson(payload): ValidatedJson<QueueConfigRequest>,
) -> Result<Json<QueueConfigResponse>, AppError> {
    let session = switchboard
        .replace(QueueIdentity::new(payload.queue_name, payload.queue_url))
        .await?;

    let queue_url = session.resolved_url().unwrap_or_default().to_string();

    Ok(Json(QueueConfigResponse {
        status: "ok".to_string(),
        queue_name: session.display_name().to_string(),
        reconnected: !queue_url.is_empty(),
        queue_url,
    }))
}
