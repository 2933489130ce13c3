use crate::types::Environment;
use aide::{axum::ApiRouter, openapi::OpenApi, scalar::Scalar};
use axum::http::StatusCode;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json,
};

pub fn handler() -> ApiRouter {
    let scalar = Scalar::new("/openapi.json").with_title("SQS UI Docs");

    ApiRouter::new()
        .route("/docs", scalar.axum_route())
        .route("/openapi.json", get(openapi_schema))
        .layer(middleware::from_fn(docs_enabled))
}

/// Hides the docs routes where API docs are disabled
async fn docs_enabled(
    Extension(environment): Extension<Environment>,
    request: Request,
    next: Next,
) -> Response {
    if !environment.show_api_docs() {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

#[allow(clippy::unused_async)]
async fn openapi_schema(Extension(openapi): Extension<OpenApi>) -> impl IntoResponse {
    Json(openapi).into_response()
}
