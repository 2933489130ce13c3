/// Queue guard middleware
pub mod require_queue;

/// JSON body for request timeouts
pub mod request_timeout;

pub use request_timeout::request_timeout_envelope;
pub use require_queue::require_queue;
