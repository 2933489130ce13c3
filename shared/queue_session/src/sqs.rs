//! AWS SQS backend
//!
//! Thin adapter from the `QueueBackend` seam onto `aws_sdk_sqs`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{retry::RetryConfig, BehaviorVersion, Region};
use aws_sdk_sqs::{
    error::{DisplayErrorContext, SdkError},
    operation::get_queue_url::GetQueueUrlError,
    types::QueueAttributeName,
    Client as SqsClient,
};

use crate::backend::{
    ApproximateCounts, BackendConnector, BackendError, BackendResult, Message, OutgoingMessage,
    QueueBackend, ReceiveRequest,
};
use crate::identity::{region_from_url, QueueIdentity};

/// How long reloading the shared AWS config may take
pub const DEFAULT_CONFIG_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

impl<E, R> From<SdkError<E, R>> for BackendError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(error: SdkError<E, R>) -> Self {
        match error {
            SdkError::TimeoutError(_) => Self::Timeout,
            other => Self::Service(DisplayErrorContext(&other).to_string()),
        }
    }
}

/// `QueueBackend` backed by an SQS client
pub struct SqsBackend {
    sqs_client: Arc<SqsClient>,
    region: Option<String>,
}

impl SqsBackend {
    /// Creates a new SQS backend
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    /// * `region` - Region the client was configured with, if any
    #[must_use]
    pub const fn new(sqs_client: Arc<SqsClient>, region: Option<String>) -> Self {
        Self { sqs_client, region }
    }

    /// Creates a backend from a client, reading the region from its config
    #[must_use]
    pub fn from_client(sqs_client: Arc<SqsClient>) -> Self {
        let region = sqs_client.config().region().map(ToString::to_string);
        Self::new(sqs_client, region)
    }
}

#[async_trait]
impl QueueBackend for SqsBackend {
    fn region(&self) -> Option<String> {
        self.region.clone()
    }

    async fn queue_url(&self, name: &str) -> BackendResult<String> {
        let result = self
            .sqs_client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await;

        match result {
            Ok(output) => output
                .queue_url()
                .map(ToString::to_string)
                .ok_or_else(|| BackendError::Service("GetQueueUrl returned no URL".to_string())),
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), GetQueueUrlError::QueueDoesNotExist(_)) =>
            {
                Err(BackendError::QueueDoesNotExist(name.to_string()))
            }
            Err(e) => Err(BackendError::from(e)),
        }
    }

    async fn send_message(
        &self,
        queue_url: &str,
        message: OutgoingMessage,
    ) -> BackendResult<String> {
        let result = self
            .sqs_client
            .send_message()
            .queue_url(queue_url)
            .message_body(message.body)
            .set_message_group_id(message.group_id)
            .send()
            .await?;

        Ok(result
            .message_id()
            .map(ToString::to_string)
            .unwrap_or_default())
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        request: &ReceiveRequest,
    ) -> BackendResult<Vec<Message>> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(request.max_messages)
            .visibility_timeout(request.visibility_timeout_seconds)
            .wait_time_seconds(request.wait_time_seconds)
            .send()
            .await?;

        Ok(result
            .messages()
            .iter()
            .filter_map(|msg| {
                Some(Message {
                    id: msg.message_id()?.to_string(),
                    body: msg.body()?.to_string(),
                })
            })
            .collect())
    }

    async fn purge(&self, queue_url: &str) -> BackendResult<()> {
        self.sqs_client
            .purge_queue()
            .queue_url(queue_url)
            .send()
            .await?;

        Ok(())
    }

    async fn approximate_counts(&self, queue_url: &str) -> BackendResult<ApproximateCounts> {
        let result = self
            .sqs_client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesDelayed)
            .send()
            .await?;

        let counter = |name: QueueAttributeName| {
            result
                .attributes()
                .and_then(|attributes| attributes.get(&name))
                .and_then(|value| value.parse::<i64>().ok())
                .unwrap_or(0)
        };

        Ok(ApproximateCounts {
            visible: counter(QueueAttributeName::ApproximateNumberOfMessages),
            in_flight: counter(QueueAttributeName::ApproximateNumberOfMessagesNotVisible),
            delayed: counter(QueueAttributeName::ApproximateNumberOfMessagesDelayed),
        })
    }
}

/// Builds SQS backends from the shared AWS config
///
/// The config is reloaded on every `connect` so credential or region changes
/// are picked up when the queue is switched.
#[derive(Debug, Clone)]
pub struct SqsConnector {
    endpoint_url: Option<String>,
    load_timeout: Duration,
}

impl SqsConnector {
    /// Creates a connector
    ///
    /// # Arguments
    ///
    /// * `endpoint_url` - Endpoint override, e.g. `LocalStack`
    /// * `load_timeout` - Bound on loading the shared config
    #[must_use]
    pub const fn new(endpoint_url: Option<String>, load_timeout: Duration) -> Self {
        Self {
            endpoint_url,
            load_timeout,
        }
    }

    /// Loads the shared AWS config with retry settings and endpoint override
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).retry_config(retry_config);

        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        loader.load().await
    }
}

#[async_trait]
impl BackendConnector for SqsConnector {
    async fn connect(&self, identity: &QueueIdentity) -> BackendResult<Arc<dyn QueueBackend>> {
        let config = tokio::time::timeout(self.load_timeout, self.aws_config())
            .await
            .map_err(|_| BackendError::Timeout)?;

        let mut builder = aws_sdk_sqs::config::Builder::from(&config);
        let region = match config.region() {
            Some(region) => Some(region.to_string()),
            None => {
                let inferred = region_from_url(&identity.url);
                if let Some(region) = &inferred {
                    tracing::info!(region = %region, "inferred region from queue URL");
                    builder = builder.region(Region::new(region.clone()));
                } else {
                    tracing::warn!("no AWS region configured and none found in queue URL");
                }
                inferred
            }
        };

        let client = Arc::new(SqsClient::from_conf(builder.build()));
        Ok(Arc::new(SqsBackend::new(client, region)))
    }
}
