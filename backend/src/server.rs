use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aide::openapi::OpenApi;
use axum::{
    http::{header, HeaderValue, StatusCode},
    middleware, Extension, Router,
};
use queue_session::Switchboard;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    services::ServeDir, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::middleware::request_timeout_envelope;
use crate::routes;
use crate::types::{AppError, Environment};

/// Upper bound on handling a single request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the application router
///
/// API routes are served first; any other path falls back to the static UI in
/// `web_dir`. Error responses produced outside the handlers (wrong method,
/// request timeout) carry the same JSON envelope as handler errors.
pub fn app(environment: Environment, switchboard: Arc<Switchboard>, web_dir: &Path) -> Router {
    let mut openapi = OpenApi::default();

    routes::handler()
        .finish_api(&mut openapi)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback_service(ServeDir::new(web_dir))
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(switchboard))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(middleware::from_fn(request_timeout_envelope))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

#[allow(clippy::unused_async)]
async fn method_not_allowed() -> AppError {
    AppError::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    switchboard: Arc<Switchboard>,
    port: u16,
    web_dir: &Path,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = app(environment, switchboard, web_dir);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(web_dir = %web_dir.display(), "SQS UI started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(anyhow::Error::from)
}

/// Resolves once the process receives Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, initiating graceful shutdown..."),
        () = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
