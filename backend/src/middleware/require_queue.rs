use std::sync::Arc;

use axum::{extract::Request, middleware::Next, response::Response, Extension};
use queue_session::Switchboard;

use crate::types::AppError;

/// Queue guard middleware
///
/// Rejects requests to queue-bound routes with 400 while no queue name or URL
/// is configured, so handlers never reach the backend in idle mode.
///
/// # Errors
///
/// - `AppError` - No queue configured, with 400 status code
pub async fn require_queue(
    Extension(switchboard): Extension<Arc<Switchboard>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    switchboard.current().ensure_configured()?;

    Ok(next.run(request).await)
}
