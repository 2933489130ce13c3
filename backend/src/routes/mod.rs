mod docs;
pub mod health;
pub mod info;
pub mod messages;
pub mod queue_config;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};
use axum::middleware;

use crate::middleware::require_queue;

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    let public_routes = ApiRouter::new()
        .merge(docs::handler())
        .api_route("/healthz", get(health::handler))
        .api_route("/info", get(info::handler))
        .api_route("/api/config/queue", post(queue_config::update_queue));

    let queue_routes = ApiRouter::new()
        .api_route("/api/messages", get(messages::get_messages))
        .api_route("/api/send", post(messages::send_message))
        .api_route("/api/purge", post(messages::purge_queue))
        .layer(middleware::from_fn(require_queue));

    public_routes.merge(queue_routes)
}
