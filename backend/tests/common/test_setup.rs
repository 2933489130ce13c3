use std::path::PathBuf;
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use queue_session::testing::{ScriptedBackend, ScriptedConnector};
use queue_session::{BackendConnector, QueueIdentity, QueueSession, SessionSettings, Switchboard};
use sqs_ui::{server, types::Environment};
use tower::ServiceExt;

/// URL of the queue most tests bind to
pub const ORDERS_URL: &str = "https://sqs.us-east-1.amazonaws.com/000000000000/orders";

/// Initialize tracing for tests
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Directory holding the bundled static UI
pub fn web_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../web")
}

/// Router wired to a scripted backend
pub struct TestSetup {
    pub router: Router,
    pub backend: Arc<ScriptedBackend>,
    pub switchboard: Arc<Switchboard>,
}

impl TestSetup {
    /// Bound to `orders` by URL, so no lookup is needed
    pub fn new(backend: ScriptedBackend) -> Self {
        Self::with_identity(backend, QueueIdentity::new("", ORDERS_URL))
    }

    /// No queue configured
    pub fn idle(backend: ScriptedBackend) -> Self {
        Self::with_identity(backend, QueueIdentity::unbound())
    }

    pub fn with_identity(backend: ScriptedBackend, identity: QueueIdentity) -> Self {
        let backend = Arc::new(backend);
        let connector = Arc::new(ScriptedConnector::new(backend.clone()));
        Self::build(backend, connector, identity, SessionSettings::default())
    }

    pub fn build(
        backend: Arc<ScriptedBackend>,
        connector: Arc<dyn BackendConnector>,
        identity: QueueIdentity,
        settings: SessionSettings,
    ) -> Self {
        setup_test_env();

        let session = QueueSession::new(identity, backend.clone(), settings.clone());
        let switchboard = Arc::new(Switchboard::new(session, connector, settings));
        let router = server::app(Environment::Development, switchboard.clone(), &web_dir());

        Self {
            router,
            backend,
            switchboard,
        }
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_raw_post_request(
        &self,
        route: &str,
        content_type: Option<&str>,
        body: &'static str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut builder = Request::builder().uri(route).method("POST");
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        let request = builder.body(Body::from(body))?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn parse_response_body(
        &self,
        response: Response,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        use http_body_util::BodyExt;

        let body = response.into_body().collect().await?.to_bytes();
        let json = serde_json::from_slice(&body)?;
        Ok(json)
    }

    pub async fn response_text(
        &self,
        response: Response,
    ) -> Result<String, Box<dyn std::error::Error>> {
        use http_body_util::BodyExt;

        let body = response.into_body().collect().await?.to_bytes();
        Ok(String::from_utf8(body.to_vec())?)
    }
}
