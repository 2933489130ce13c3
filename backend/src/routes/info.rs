use std::sync::Arc;

use axum::{Extension, Json};
use queue_session::{QueueStatusSnapshot, Switchboard};

/// Reports the status of the bound queue
///
/// Never fails on backend trouble: an unbound or unresolved queue is reported
/// as `not_connected` and an attribute failure as `error`, with the detail in
/// the `error` field. Counts are recomputed on every request.
pub async fn handler(
    Extension(switchboard): Extension<Arc<Switchboard>>,
) -> Json<QueueStatusSnapshot> {
    Json(switchboard.current().status().await)
}
