use std::time::Duration;

use tokio::time::Instant;

use crate::backend::{BackendError, Message, QueueBackend, ReceiveRequest};
use crate::error::{QueueError, QueueResult};

/// Default overall time budget for one fetch
pub const DEFAULT_FETCH_BUDGET: Duration = Duration::from_secs(10);

/// Default cap on receive calls per fetch
pub const DEFAULT_MAX_ITERATIONS: u32 = 25;

/// How a fetch issues receive calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Follow the session's single-call setting
    #[default]
    Configured,
    /// Always loop until the queue is drained, the cap is hit or time runs out
    Drain,
}

/// Bounds for one batched fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Overall deadline for the whole fetch
    pub budget: Duration,
    /// Deadline for each receive call, further bounded by the time left
    pub per_call_timeout: Duration,
    /// Maximum number of receive calls
    pub max_iterations: u32,
    /// Parameters passed to every receive call
    pub request: ReceiveRequest,
}

/// Messages gathered by one fetch, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// Messages in the order they were received; duplicates are kept
    pub messages: Vec<Message>,
    /// The loop stopped on the deadline or the iteration cap, not on an empty batch
    pub truncated: bool,
    /// Backend error swallowed because messages had already been gathered
    pub partial_error: Option<String>,
}

impl FetchResult {
    /// Number of messages gathered
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no message was gathered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Aggregates repeated receive calls into one result
///
/// A single receive call only returns a sample of the visible messages, so
/// the engine keeps calling until a call comes back empty, the iteration cap
/// is reached or the budget runs out. Once at least one message has been
/// gathered, a timeout or backend error ends the loop and the partial result
/// is returned; the error is kept in `partial_error`.
///
/// # Errors
///
/// Returns `QueueError::FetchTimeout` when the deadline passes with nothing
/// gathered, and `QueueError::Backend` when the first failing call happens
/// before any message arrived
pub async fn fetch_batched(
    backend: &dyn QueueBackend,
    queue_url: &str,
    options: &FetchOptions,
) -> QueueResult<FetchResult> {
    let started = Instant::now();
    let deadline = started + options.budget;
    let max_iterations = options.max_iterations.max(1);
    let mut result = FetchResult::default();
    let mut iterations = 0;

    while iterations < max_iterations {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            if result.is_empty() {
                return Err(QueueError::FetchTimeout);
            }
            tracing::warn!(count = result.len(), "receive deadline reached after partial retrieval");
            result.truncated = true;
            break;
        }

        iterations += 1;
        let outcome = tokio::time::timeout(
            remaining.min(options.per_call_timeout),
            backend.receive_messages(queue_url, &options.request),
        )
        .await
        .unwrap_or(Err(BackendError::Timeout));

        match outcome {
            Ok(batch) if batch.is_empty() => break,
            Ok(batch) => {
                tracing::debug!(
                    batch_count = batch.len(),
                    total = result.len() + batch.len(),
                    iteration = iterations,
                    "receive batch"
                );
                result.messages.extend(batch);
                if iterations == max_iterations {
                    result.truncated = true;
                    if max_iterations > 1 {
                        tracing::warn!(
                            cap = max_iterations,
                            count = result.len(),
                            "receive loop iteration cap reached"
                        );
                    }
                }
            }
            Err(BackendError::Timeout) if result.is_empty() => {
                return Err(QueueError::FetchTimeout);
            }
            Err(source) if result.is_empty() => {
                return Err(QueueError::backend("receive messages", source));
            }
            Err(BackendError::Timeout) => {
                tracing::warn!(count = result.len(), "receive timeout after partial retrieval");
                result.truncated = true;
                break;
            }
            Err(source) => {
                tracing::warn!(
                    count = result.len(),
                    error = %source,
                    "receive failed after partial retrieval, returning partial result"
                );
                result.truncated = true;
                result.partial_error = Some(source.to_string());
                break;
            }
        }
    }

    tracing::info!(
        count = result.len(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        iterations,
        truncated = result.truncated,
        "messages fetched"
    );

    Ok(result)
}
