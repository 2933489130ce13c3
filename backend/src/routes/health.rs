use aide::axum::IntoApiResponse;
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::version;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    status: String,
    /// Current version of the application
    version: String,
    /// Commit hash of the current build
    commit: String,
    /// Build timestamp
    build_time: String,
}

/// Health check endpoint
///
/// Liveness only: reports version information without touching the queue.
pub async fn handler() -> impl IntoApiResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION.to_string(),
        commit: version::COMMIT.to_string(),
        build_time: version::BUILD_TIME.to_string(),
    })
}
