//! Scripted in-memory backend
//!
//! Receive calls replay a script of batches, stalls and failures so fetch
//! behaviour can be exercised deterministically. Every call is counted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{
    ApproximateCounts, BackendConnector, BackendError, BackendResult, Message, OutgoingMessage,
    QueueBackend, ReceiveRequest,
};
use crate::identity::QueueIdentity;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds messages with the given IDs and a body of `body-<id>`
#[must_use]
pub fn messages(ids: &[&str]) -> Vec<Message> {
    ids.iter()
        .map(|id| Message {
            id: (*id).to_string(),
            body: format!("body-{id}"),
        })
        .collect()
}

/// One scripted receive outcome
#[derive(Debug, Clone)]
pub enum ReceiveStep {
    /// Return these messages
    Batch(Vec<Message>),
    /// Sleep, then return an empty batch
    Stall(Duration),
    /// Fail with this error
    Fail(BackendError),
}

/// Number of calls made per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Queue URL lookups
    pub queue_url: usize,
    /// Send calls
    pub send: usize,
    /// Receive calls
    pub receive: usize,
    /// Purge calls
    pub purge: usize,
    /// Attribute lookups
    pub attributes: usize,
}

impl CallCounts {
    /// Total calls across all operations
    #[must_use]
    pub const fn total(&self) -> usize {
        self.queue_url + self.send + self.receive + self.purge + self.attributes
    }
}

/// In-memory `QueueBackend` driven by a script
#[derive(Default)]
pub struct ScriptedBackend {
    region: Option<String>,
    queues: Mutex<HashMap<String, String>>,
    lookup_delay: Duration,
    lookup_failures: Mutex<VecDeque<BackendError>>,
    receive_script: Mutex<VecDeque<ReceiveStep>>,
    counts: Mutex<Option<BackendResult<ApproximateCounts>>>,
    send_failure: Option<BackendError>,
    purge_failure: Option<BackendError>,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    calls: Mutex<CallCounts>,
}

impl ScriptedBackend {
    /// Creates an empty backend with no queues
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the region reported by the backend
    #[must_use]
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Registers a queue name and URL for lookups
    #[must_use]
    pub fn with_queue(self, name: &str, url: &str) -> Self {
        lock(&self.queues).insert(name.to_string(), url.to_string());
        self
    }

    /// Delays every URL lookup
    #[must_use]
    pub const fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    /// Fails the next URL lookup with the given error
    #[must_use]
    pub fn with_lookup_failure(self, error: BackendError) -> Self {
        lock(&self.lookup_failures).push_back(error);
        self
    }

    /// Appends receive steps; an exhausted script returns empty batches
    #[must_use]
    pub fn with_receive_script(self, steps: impl IntoIterator<Item = ReceiveStep>) -> Self {
        lock(&self.receive_script).extend(steps);
        self
    }

    /// Sets the result of attribute lookups
    #[must_use]
    pub fn with_counts(self, counts: BackendResult<ApproximateCounts>) -> Self {
        *lock(&self.counts) = Some(counts);
        self
    }

    /// Fails every send with the given error
    #[must_use]
    pub fn with_send_failure(mut self, error: BackendError) -> Self {
        self.send_failure = Some(error);
        self
    }

    /// Fails every purge with the given error
    #[must_use]
    pub fn with_purge_failure(mut self, error: BackendError) -> Self {
        self.purge_failure = Some(error);
        self
    }

    /// Snapshot of the call counters
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        *lock(&self.calls)
    }

    /// Messages sent so far, paired with the queue URL they were sent to
    #[must_use]
    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl QueueBackend for ScriptedBackend {
    fn region(&self) -> Option<String> {
        self.region.clone()
    }

    async fn queue_url(&self, name: &str) -> BackendResult<String> {
        lock(&self.calls).queue_url += 1;
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        if let Some(error) = lock(&self.lookup_failures).pop_front() {
            return Err(error);
        }
        lock(&self.queues)
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::QueueDoesNotExist(name.to_string()))
    }

    async fn send_message(
        &self,
        queue_url: &str,
        message: OutgoingMessage,
    ) -> BackendResult<String> {
        let id = {
            let mut calls = lock(&self.calls);
            calls.send += 1;
            format!("sent-{}", calls.send)
        };
        if let Some(error) = &self.send_failure {
            return Err(error.clone());
        }
        lock(&self.sent).push((queue_url.to_string(), message));
        Ok(id)
    }

    async fn receive_messages(
        &self,
        _queue_url: &str,
        request: &ReceiveRequest,
    ) -> BackendResult<Vec<Message>> {
        lock(&self.calls).receive += 1;
        let step = lock(&self.receive_script).pop_front();
        match step {
            None => Ok(Vec::new()),
            Some(ReceiveStep::Batch(mut batch)) => {
                batch.truncate(usize::try_from(request.max_messages).unwrap_or(0));
                Ok(batch)
            }
            Some(ReceiveStep::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
            Some(ReceiveStep::Fail(error)) => Err(error),
        }
    }

    async fn purge(&self, _queue_url: &str) -> BackendResult<()> {
        lock(&self.calls).purge += 1;
        self.purge_failure.clone().map_or(Ok(()), Err)
    }

    async fn approximate_counts(&self, _queue_url: &str) -> BackendResult<ApproximateCounts> {
        lock(&self.calls).attributes += 1;
        lock(&self.counts)
            .clone()
            .unwrap_or_else(|| Ok(ApproximateCounts::default()))
    }
}

/// `BackendConnector` handing out a shared scripted backend
pub struct ScriptedConnector {
    backend: Result<Arc<ScriptedBackend>, BackendError>,
    connected: Mutex<Vec<QueueIdentity>>,
}

impl ScriptedConnector {
    /// Connector returning `backend` for every identity
    #[must_use]
    pub const fn new(backend: Arc<ScriptedBackend>) -> Self {
        Self {
            backend: Ok(backend),
            connected: Mutex::new(Vec::new()),
        }
    }

    /// Connector whose every connection attempt fails
    #[must_use]
    pub const fn failing(error: BackendError) -> Self {
        Self {
            backend: Err(error),
            connected: Mutex::new(Vec::new()),
        }
    }

    /// Identities passed to `connect` so far
    #[must_use]
    pub fn connected(&self) -> Vec<QueueIdentity> {
        lock(&self.connected).clone()
    }
}

#[async_trait]
impl BackendConnector for ScriptedConnector {
    async fn connect(&self, identity: &QueueIdentity) -> BackendResult<Arc<dyn QueueBackend>> {
        lock(&self.connected).push(identity.clone());
        match &self.backend {
            Ok(backend) => Ok(backend.clone() as Arc<dyn QueueBackend>),
            Err(error) => Err(error.clone()),
        }
    }
}
