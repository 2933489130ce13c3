use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::backend::{BackendError, OutgoingMessage, QueueBackend, ReceiveRequest};
use crate::error::{QueueError, QueueResult};
use crate::fetch::{self, FetchMode, FetchOptions, FetchResult};
use crate::identity::{self, is_fifo_queue, region_from_url, QueueIdentity, Resolution};

/// Group ID used for FIFO sends when none is configured
pub const DEFAULT_GROUP_ID: &str = "default";

/// Upper bound on the delay between failed resolution attempts
const MAX_RESOLUTION_BACKOFF: Duration = Duration::from_secs(30);

/// Largest batch a single receive call may request
const MAX_RECEIVE_BATCH: i32 = 10;

/// Configuration values applied to every operation of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Message group ID attached to sends on FIFO queues
    pub default_group_id: String,
    /// Deadline for each backend call
    pub operation_timeout: Duration,
    /// Receive batch size cap (1-10)
    pub max_receive_messages: i32,
    /// Long-poll wait hint for receive calls, in seconds
    pub receive_wait_seconds: i32,
    /// Visibility window applied to received messages, in seconds
    pub visibility_timeout_seconds: i32,
    /// Issue one receive call per fetch instead of looping
    pub single_call_receive: bool,
    /// Deadline for the name to URL lookup
    pub resolve_timeout: Duration,
    /// Overall deadline for one fetch
    pub fetch_budget: Duration,
    /// Maximum receive calls per fetch
    pub max_fetch_iterations: u32,
    /// Delay before retrying a failed resolution, doubled per failure; zero retries every call
    pub resolution_backoff: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_group_id: DEFAULT_GROUP_ID.to_string(),
            operation_timeout: Duration::from_secs(10),
            max_receive_messages: MAX_RECEIVE_BATCH,
            receive_wait_seconds: 0,
            visibility_timeout_seconds: 30,
            single_call_receive: false,
            resolve_timeout: Duration::from_secs(5),
            fetch_budget: fetch::DEFAULT_FETCH_BUDGET,
            max_fetch_iterations: fetch::DEFAULT_MAX_ITERATIONS,
            resolution_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Default)]
struct ResolutionBackoff {
    failures: u32,
    retry_at: Option<Instant>,
    last_error: Option<QueueError>,
}

impl ResolutionBackoff {
    fn cached_failure(&self, now: Instant) -> Option<QueueError> {
        match (self.retry_at, &self.last_error) {
            (Some(retry_at), Some(error)) if now < retry_at => Some(error.clone()),
            _ => None,
        }
    }

    fn record_failure(&mut self, error: QueueError, initial: Duration, now: Instant) {
        if initial.is_zero() {
            return;
        }
        let delay = initial
            .saturating_mul(1 << self.failures.min(16))
            .min(MAX_RESOLUTION_BACKOFF);
        self.failures = self.failures.saturating_add(1);
        self.retry_at = Some(now + delay);
        self.last_error = Some(error);
    }
}

/// The binding every queue operation goes through
///
/// A session is never mutated to point at another queue; reconfiguration
/// builds a new one. The endpoint is resolved at most once per session and
/// cached; until then each operation that needs it tries again, subject to
/// the resolution backoff.
pub struct QueueSession {
    identity: QueueIdentity,
    display_name: String,
    region: String,
    backend: Arc<dyn QueueBackend>,
    settings: SessionSettings,
    endpoint: OnceCell<Resolution>,
    backoff: Mutex<ResolutionBackoff>,
}

impl fmt::Debug for QueueSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSession")
            .field("identity", &self.identity)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint.get())
            .finish_non_exhaustive()
    }
}

impl QueueSession {
    /// Creates a session without touching the network
    ///
    /// A configured URL counts as resolved immediately.
    #[must_use]
    pub fn new(
        identity: QueueIdentity,
        backend: Arc<dyn QueueBackend>,
        settings: SessionSettings,
    ) -> Self {
        let region = backend
            .region()
            .filter(|r| !r.is_empty())
            .or_else(|| region_from_url(&identity.url))
            .unwrap_or_default();
        let endpoint = if identity.url.is_empty() {
            OnceCell::new()
        } else {
            OnceCell::new_with(Some(Resolution {
                url: identity.url.clone(),
                region: region.clone(),
            }))
        };

        Self {
            display_name: identity.display_name(),
            identity,
            region,
            backend,
            settings,
            endpoint,
            backoff: Mutex::new(ResolutionBackoff::default()),
        }
    }

    /// Creates a session and makes one best-effort attempt to resolve it
    ///
    /// A failed resolution is logged and left for the next operation to retry.
    pub async fn connect(
        identity: QueueIdentity,
        backend: Arc<dyn QueueBackend>,
        settings: SessionSettings,
    ) -> Self {
        let session = Self::new(identity, backend, settings);
        if session.identity.is_bound() {
            if let Err(err) = session.endpoint().await {
                tracing::warn!(
                    queue_name = %session.display_name,
                    error = %err,
                    "queue not resolved yet, will retry on next operation"
                );
            }
        } else {
            tracing::warn!("no queue name or URL configured - running in idle mode");
        }
        session
    }

    /// Identity the session was built from
    #[must_use]
    pub const fn identity(&self) -> &QueueIdentity {
        &self.identity
    }

    /// Configured name, or the last segment of the configured URL
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Region of the backend, or the one embedded in the endpoint
    #[must_use]
    pub fn region(&self) -> String {
        self.endpoint
            .get()
            .map_or_else(|| self.region.clone(), |resolution| resolution.region.clone())
    }

    /// Endpoint if it has been resolved
    #[must_use]
    pub fn resolved_url(&self) -> Option<&str> {
        self.endpoint
            .get()
            .map(|resolution| resolution.url.as_str())
    }

    /// Settings applied to operations
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Whether the bound queue is a FIFO queue
    #[must_use]
    pub fn is_fifo(&self) -> bool {
        is_fifo_queue(&self.display_name)
    }

    pub(crate) fn backend(&self) -> &dyn QueueBackend {
        self.backend.as_ref()
    }

    /// Checks that a queue name or URL is bound
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NotConfigured` when both are empty
    pub fn ensure_configured(&self) -> QueueResult<()> {
        if self.identity.is_bound() {
            Ok(())
        } else {
            Err(QueueError::NotConfigured)
        }
    }

    /// Resolved endpoint, resolving it now if needed
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NotConfigured` for an unbound session and
    /// `QueueError::Resolution` when the lookup fails or is backing off
    pub async fn endpoint(&self) -> QueueResult<&str> {
        self.ensure_configured()?;
        self.endpoint
            .get_or_try_init(|| self.resolve_endpoint())
            .await
            .map(|resolution| resolution.url.as_str())
    }

    async fn resolve_endpoint(&self) -> QueueResult<Resolution> {
        let cached = self.lock_backoff().cached_failure(Instant::now());
        if let Some(err) = cached {
            tracing::debug!(queue_name = %self.display_name, "resolution backing off");
            return Err(err);
        }

        match identity::resolve(
            &self.identity,
            self.backend.as_ref(),
            self.settings.resolve_timeout,
        )
        .await
        {
            Ok(resolution) => {
                *self.lock_backoff() = ResolutionBackoff::default();
                Ok(resolution)
            }
            Err(err) => {
                self.lock_backoff().record_failure(
                    err.clone(),
                    self.settings.resolution_backoff,
                    Instant::now(),
                );
                Err(err)
            }
        }
    }

    fn lock_backoff(&self) -> std::sync::MutexGuard<'_, ResolutionBackoff> {
        self.backoff.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends a message, attaching the default group ID on FIFO queues
    ///
    /// # Returns
    ///
    /// The backend-assigned message ID
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NotConfigured` or `QueueError::EmptyMessage`
    /// before any backend call, `QueueError::Resolution` when the endpoint is
    /// unknown and `QueueError::Backend` when the send fails
    pub async fn send(&self, body: &str) -> QueueResult<String> {
        self.ensure_configured()?;
        if body.is_empty() {
            return Err(QueueError::EmptyMessage);
        }
        let url = self.endpoint().await?;

        let group_id = self.is_fifo().then(|| {
            if self.settings.default_group_id.is_empty() {
                DEFAULT_GROUP_ID.to_string()
            } else {
                self.settings.default_group_id.clone()
            }
        });

        let message_id = tokio::time::timeout(
            self.settings.operation_timeout,
            self.backend.send_message(
                url,
                OutgoingMessage {
                    body: body.to_string(),
                    group_id,
                },
            ),
        )
        .await
        .unwrap_or(Err(BackendError::Timeout))
        .map_err(|source| QueueError::backend("send message", source))?;

        tracing::info!(queue = %self.display_name, message_id = %message_id, "message sent");
        Ok(message_id)
    }

    /// Peeks at the queue by aggregating receive calls
    ///
    /// `max` caps the batch size per receive call; `None` or a non-positive
    /// value uses the configured cap.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NotConfigured`, `QueueError::Resolution`, or the
    /// fetch errors described on [`fetch::fetch_batched`]
    pub async fn fetch(&self, mode: FetchMode, max: Option<i32>) -> QueueResult<FetchResult> {
        self.ensure_configured()?;
        let url = self.endpoint().await?;
        let options = self.fetch_options(mode, max);
        tracing::debug!(
            max = options.request.max_messages,
            iterations = options.max_iterations,
            "receive"
        );
        fetch::fetch_batched(self.backend.as_ref(), url, &options).await
    }

    fn fetch_options(&self, mode: FetchMode, max: Option<i32>) -> FetchOptions {
        let cap = self.settings.max_receive_messages.clamp(1, MAX_RECEIVE_BATCH);
        let max_messages = match max {
            Some(requested) if requested > 0 => requested.min(cap),
            _ => cap,
        };
        let max_iterations = match mode {
            FetchMode::Configured if self.settings.single_call_receive => 1,
            _ => self.settings.max_fetch_iterations,
        };

        FetchOptions {
            budget: self.settings.fetch_budget,
            per_call_timeout: self.settings.operation_timeout,
            max_iterations,
            request: ReceiveRequest {
                max_messages,
                visibility_timeout_seconds: self.settings.visibility_timeout_seconds,
                wait_time_seconds: self.settings.receive_wait_seconds,
            },
        }
    }

    /// Deletes every message in the queue
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NotConfigured`, `QueueError::Resolution`, or
    /// `QueueError::Backend` when the purge fails
    pub async fn purge(&self) -> QueueResult<()> {
        self.ensure_configured()?;
        let url = self.endpoint().await?;

        tokio::time::timeout(self.settings.operation_timeout, self.backend.purge(url))
            .await
            .unwrap_or(Err(BackendError::Timeout))
            .map_err(|source| QueueError::backend("purge queue", source))?;

        tracing::info!(queue = %self.display_name, "queue purged");
        Ok(())
    }
}
