//! SQS UI backend service

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Request middleware
pub mod middleware;

/// API routes
#[allow(missing_docs)]
pub mod routes;

/// Server setup
pub mod server;

/// Common types
#[allow(missing_docs)]
pub mod types;

/// Build metadata
pub mod version;
