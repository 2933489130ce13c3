use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::{BackendError, QueueBackend};
use crate::error::{QueueError, QueueResult};

/// `sqs.<region>.amazonaws.com` and the legacy `<region>.queue.amazonaws.com`
static REGION_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:sqs\.([a-z0-9-]+)|([a-z0-9-]+)\.queue)\.amazonaws\.com(?:\.cn)?$")
        .expect("region pattern is valid")
});

/// Name and/or URL addressing a single queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueIdentity {
    /// Queue name, e.g. `orders` or `orders.fifo`
    pub name: String,
    /// Queue URL, used verbatim when set
    pub url: String,
}

impl QueueIdentity {
    /// Creates an identity, trimming surrounding whitespace
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            url: url.into().trim().to_string(),
        }
    }

    /// An identity that addresses no queue
    #[must_use]
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Whether a name or URL is set
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.name.is_empty() || !self.url.is_empty()
    }

    /// Name shown to operators: the configured name, or the last URL segment
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            queue_name_from_url(&self.url).to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Outcome of resolving an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Queue endpoint
    pub url: String,
    /// Region, empty when it could not be determined
    pub region: String,
}

/// Whether a queue name denotes a FIFO queue
///
/// FIFO queue names must end in `.fifo`; the comparison ignores case.
#[must_use]
pub fn is_fifo_queue(name: &str) -> bool {
    name.len() >= 5
        && name
            .get(name.len() - 5..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(".fifo"))
}

/// Final path segment of a queue URL
#[must_use]
pub fn queue_name_from_url(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Region embedded in an AWS queue URL host
#[must_use]
pub fn region_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let captures = REGION_HOST.captures(host)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_string())
}

/// Resolves an identity to its endpoint and region
///
/// A configured URL is used verbatim and costs no network call. A bare name
/// is looked up once, bounded by `timeout`. The region comes from the
/// backend when it has one, otherwise from the endpoint host; failing to find
/// it leaves the region empty.
///
/// # Errors
///
/// Returns `QueueError::NotConfigured` for an unbound identity and
/// `QueueError::Resolution` when the lookup fails or times out
pub async fn resolve(
    identity: &QueueIdentity,
    backend: &dyn QueueBackend,
    timeout: Duration,
) -> QueueResult<Resolution> {
    let url = if !identity.url.is_empty() {
        identity.url.clone()
    } else if !identity.name.is_empty() {
        lookup_url(&identity.name, backend, timeout).await?
    } else {
        return Err(QueueError::NotConfigured);
    };

    let region = backend
        .region()
        .filter(|r| !r.is_empty())
        .or_else(|| region_from_url(&url))
        .unwrap_or_default();

    Ok(Resolution { url, region })
}

async fn lookup_url(
    name: &str,
    backend: &dyn QueueBackend,
    timeout: Duration,
) -> QueueResult<String> {
    let result = tokio::time::timeout(timeout, backend.queue_url(name))
        .await
        .unwrap_or(Err(BackendError::Timeout));

    match result {
        Ok(url) => {
            tracing::info!(queue_name = %name, queue_url = %url, "resolved queue URL");
            Ok(url)
        }
        Err(source) => {
            tracing::error!(queue_name = %name, error = %source, "failed to resolve queue URL");
            Err(QueueError::Resolution {
                name: name.to_string(),
                source,
            })
        }
    }
}
