use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::types::AppError;

/// Gives timed-out requests the API error envelope
///
/// The timeout layer answers 408 with an empty body; this middleware sits
/// outside it and replaces that response with a JSON error.
pub async fn request_timeout_envelope(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return AppError::new(StatusCode::REQUEST_TIMEOUT, "request timed out").into_response();
    }
    response
}
