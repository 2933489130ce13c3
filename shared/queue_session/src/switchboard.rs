use std::sync::{Arc, PoisonError, RwLock};

use crate::backend::BackendConnector;
use crate::error::ReconfigureError;
use crate::identity::QueueIdentity;
use crate::session::{QueueSession, SessionSettings};

/// Holder of the active session
///
/// Readers clone the current `Arc` under a read lock and keep using it for the
/// whole operation. `replace` builds the new session, resolution attempt
/// included, before taking the write lock, which is held only for the swap.
/// Operations running on the previous session finish against it.
pub struct Switchboard {
    current: RwLock<Arc<QueueSession>>,
    connector: Arc<dyn BackendConnector>,
    settings: SessionSettings,
}

impl Switchboard {
    /// Creates a switchboard serving `initial`
    ///
    /// New sessions built by `replace` get a backend from `connector` and
    /// use `settings`.
    #[must_use]
    pub fn new(
        initial: QueueSession,
        connector: Arc<dyn BackendConnector>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            connector,
            settings,
        }
    }

    /// The active session
    #[must_use]
    pub fn current(&self) -> Arc<QueueSession> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds a session for `identity` and makes it the active one
    ///
    /// # Returns
    ///
    /// The newly installed session
    ///
    /// # Errors
    ///
    /// Returns `ReconfigureError::EmptyIdentity` when neither name nor URL is
    /// set and `ReconfigureError::Connect` when no backend handle could be
    /// built. In both cases the active session is left untouched.
    pub async fn replace(
        &self,
        identity: QueueIdentity,
    ) -> Result<Arc<QueueSession>, ReconfigureError> {
        if !identity.is_bound() {
            return Err(ReconfigureError::EmptyIdentity);
        }

        let backend = self.connector.connect(&identity).await.map_err(|err| {
            tracing::warn!(error = %err, "failed to reload AWS config");
            ReconfigureError::Connect(err)
        })?;

        let session =
            Arc::new(QueueSession::connect(identity, backend, self.settings.clone()).await);

        let previous = {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, session.clone())
        };

        tracing::info!(
            previous_queue = %previous.display_name(),
            queue_name = %session.display_name(),
            queue_url = %session.resolved_url().unwrap_or_default(),
            "SQS queue updated"
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::BackendError;
    use crate::fetch::FetchMode;
    use crate::testing::{messages, ReceiveStep, ScriptedBackend, ScriptedConnector};
    use pretty_assertions::assert_eq;

    fn switchboard(backend: &Arc<ScriptedBackend>) -> Switchboard {
        let settings = SessionSettings::default();
        Switchboard::new(
            QueueSession::new(
                QueueIdentity::new("orders", "https://queue.example/acct/orders"),
                backend.clone(),
                settings.clone(),
            ),
            Arc::new(ScriptedConnector::new(backend.clone())),
            settings,
        )
    }

    #[tokio::test]
    async fn test_replace_rejects_empty_identity() {
        let backend = Arc::new(ScriptedBackend::new());
        let switchboard = switchboard(&backend);
        let before = switchboard.current();

        let err = switchboard
            .replace(QueueIdentity::new("", ""))
            .await
            .expect_err("empty identity must be rejected");

        assert_eq!(err, ReconfigureError::EmptyIdentity);
        assert!(Arc::ptr_eq(&before, &switchboard.current()));
    }

    #[tokio::test]
    async fn test_replace_keeps_session_when_connect_fails() {
        let backend = Arc::new(ScriptedBackend::new());
        let settings = SessionSettings::default();
        let connector = Arc::new(ScriptedConnector::failing(BackendError::Timeout));
        let switchboard = Switchboard::new(
            QueueSession::new(
                QueueIdentity::new("orders", "https://queue.example/acct/orders"),
                backend.clone(),
                settings.clone(),
            ),
            connector.clone(),
            settings,
        );
        let before = switchboard.current();

        let err = switchboard
            .replace(QueueIdentity::new("", ""))
            .await
            .expect_err("empty identity must be rejected");
        assert_eq!(err, ReconfigureError::EmptyIdentity);
        assert!(connector.connected().is_empty());

        let err = switchboard
            .replace(QueueIdentity::new("other", ""))
            .await
            .expect_err("connect failure must reject");

        assert_eq!(err, ReconfigureError::Connect(BackendError::Timeout));
        assert_eq!(connector.connected(), vec![QueueIdentity::new("other", "")]);
        assert!(Arc::ptr_eq(&before, &switchboard.current()));
        assert_eq!(backend.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_replace_installs_new_session() {
        let backend = Arc::new(ScriptedBackend::new());
        let switchboard = switchboard(&backend);

        let installed = switchboard
            .replace(QueueIdentity::new(
                "",
                "https://queue.example/acct/new-queue.fifo",
            ))
            .await
            .expect("replace should succeed");

        let current = switchboard.current();
        assert!(Arc::ptr_eq(&installed, &current));
        assert_eq!(current.display_name(), "new-queue.fifo");
        assert_eq!(
            current.resolved_url(),
            Some("https://queue.example/acct/new-queue.fifo")
        );

        current.send("hello").await.expect("send should succeed");
        assert_eq!(backend.sent()[0].1.group_id.as_deref(), Some("default"));
    }

    #[tokio::test]
    async fn test_replace_with_unresolvable_name_still_installs() {
        let backend = Arc::new(ScriptedBackend::new());
        let switchboard = switchboard(&backend);

        let installed = switchboard
            .replace(QueueIdentity::new("missing", ""))
            .await
            .expect("resolution failure is not a reconfiguration failure");

        assert_eq!(installed.resolved_url(), None);
        assert_eq!(switchboard.current().display_name(), "missing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_operation_finishes_on_old_session() {
        let backend = Arc::new(ScriptedBackend::new().with_receive_script([
            ReceiveStep::Batch(messages(&["a"])),
            ReceiveStep::Stall(Duration::from_secs(1)),
        ]));
        let switchboard = Arc::new(switchboard(&backend));

        let old = switchboard.current();
        let fetch = tokio::spawn(async move { old.fetch(FetchMode::Drain, None).await });
        tokio::task::yield_now().await;

        switchboard
            .replace(QueueIdentity::new("", "https://queue.example/acct/next"))
            .await
            .expect("replace should succeed");

        let result = fetch
            .await
            .expect("task should not panic")
            .expect("old session fetch should complete");
        assert_eq!(result.len(), 1);
        assert_eq!(switchboard.current().display_name(), "next");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_observe_mixed_session() {
        let backend = Arc::new(ScriptedBackend::new());
        let switchboard = Arc::new(switchboard(&backend));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let switchboard = switchboard.clone();
                tokio::spawn(async move {
                    for _ in 0..2_000 {
                        let session = switchboard.current();
                        let identity = session.identity();
                        assert_eq!(
                            identity.url,
                            format!("https://queue.example/acct/{}", identity.name)
                        );
                        assert_eq!(session.display_name(), identity.name);
                        assert_eq!(session.resolved_url(), Some(identity.url.as_str()));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for i in 0..200 {
            let name = format!("queue-{i}");
            switchboard
                .replace(QueueIdentity::new(
                    name.clone(),
                    format!("https://queue.example/acct/{name}"),
                ))
                .await
                .expect("replace should succeed");
        }

        for reader in futures::future::join_all(readers).await {
            reader.expect("reader observed a mixed session");
        }
    }
}
