//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use queue_session::{QueueError, ReconfigureError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API error response envelope
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiErrorResponse {
    /// HTTP status text, e.g. "Bad Request"
    pub error: String,
    /// Human-readable error detail
    pub detail: String,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    detail: String,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// 400 Bad Request
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    /// Status code of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Detail message of the response
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(status = %self.status, detail = %self.detail, "Client error"),
            500..=599 => {
                tracing::error!(status = %self.status, detail = %self.detail, "Server error");
            }
            _ => {}
        }

        let body = ApiErrorResponse {
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            detail: self.detail,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert queue errors to application errors
impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        let status = match &err {
            QueueError::NotConfigured | QueueError::EmptyMessage => StatusCode::BAD_REQUEST,
            QueueError::FetchTimeout => StatusCode::GATEWAY_TIMEOUT,
            QueueError::Resolution { .. } | QueueError::Backend { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self::new(status, err.to_string())
    }
}

/// Convert reconfiguration errors to application errors
impl From<ReconfigureError> for AppError {
    fn from(err: ReconfigureError) -> Self {
        let status = match &err {
            ReconfigureError::EmptyIdentity => StatusCode::BAD_REQUEST,
            ReconfigureError::Connect(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        Self::new(status, err.to_string())
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
