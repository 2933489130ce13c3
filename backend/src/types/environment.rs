//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use queue_session::{QueueIdentity, SessionSettings, SqsConnector};
use tracing::Level;

/// Default LocalStack endpoint used in development
const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "production".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Whether logs are emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub fn override_aws_endpoint_url(&self) -> Option<String> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some(
                env::var("AWS_ENDPOINT_URL")
                    .ok()
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| LOCALSTACK_ENDPOINT.to_string()),
            ),
        }
    }

    /// Connector building SQS clients for this environment
    #[must_use]
    pub fn sqs_connector(&self) -> SqsConnector {
        SqsConnector::new(
            self.override_aws_endpoint_url(),
            queue_session::sqs::DEFAULT_CONFIG_LOAD_TIMEOUT,
        )
    }

    /// Queue configured at startup from `QUEUE_NAME` and `QUEUE_URL`
    #[must_use]
    pub fn queue_identity(&self) -> QueueIdentity {
        QueueIdentity::new(
            env::var("QUEUE_NAME").unwrap_or_default(),
            env::var("QUEUE_URL").unwrap_or_default(),
        )
    }

    /// Session settings read from the `SQS_*` variables
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        let defaults = SessionSettings::default();

        SessionSettings {
            default_group_id: env::var("SQS_DEFAULT_GROUP_ID")
                .ok()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .unwrap_or(defaults.default_group_id),
            operation_timeout: Duration::from_secs(parse_positive_env(
                "SQS_OPERATION_TIMEOUT_SECONDS",
                defaults.operation_timeout.as_secs(),
            )),
            max_receive_messages: parse_positive_env(
                "SQS_MAX_RECEIVE_MESSAGES",
                defaults.max_receive_messages,
            )
            .clamp(1, 10),
            receive_wait_seconds: parse_positive_env(
                "SQS_RECEIVE_WAIT_SECONDS",
                defaults.receive_wait_seconds,
            )
            .clamp(0, 20),
            visibility_timeout_seconds: parse_positive_env(
                "SQS_VISIBILITY_TIMEOUT_SECONDS",
                defaults.visibility_timeout_seconds,
            ),
            single_call_receive: parse_bool_env(
                "SQS_SINGLE_CALL_RECEIVE",
                defaults.single_call_receive,
            ),
            resolution_backoff: Duration::from_millis(parse_positive_env(
                "SQS_RESOLUTION_BACKOFF_MS",
                u64::try_from(defaults.resolution_backoff.as_millis()).unwrap_or(u64::MAX),
            )),
            ..defaults
        }
    }

    /// Log level from `LOG_LEVEL`, used when `RUST_LOG` is not set
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        match env::var("LOG_LEVEL")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Staging => write!(f, "staging"),
            Self::Development => write!(f, "development"),
        }
    }
}

/// Reads a positive number, falling back to `default` when unset, unparsable or not positive
fn parse_positive_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default,
{
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
        .unwrap_or(default)
}

/// Reads a boolean flag, accepting 1/true/yes/y and 0/false/no/n
fn parse_bool_env(key: &str, default: bool) -> bool {
    match env::var(key)
        .unwrap_or_default()
        .trim()
        .to_lowercase()
        .as_str()
    {
        "1" | "true" | "yes" | "y" => true,
        "0" | "false" | "no" | "n" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SQS_VARS: [&str; 7] = [
        "SQS_DEFAULT_GROUP_ID",
        "SQS_OPERATION_TIMEOUT_SECONDS",
        "SQS_MAX_RECEIVE_MESSAGES",
        "SQS_RECEIVE_WAIT_SECONDS",
        "SQS_VISIBILITY_TIMEOUT_SECONDS",
        "SQS_SINGLE_CALL_RECEIVE",
        "SQS_RESOLUTION_BACKOFF_MS",
    ];

    fn clear_sqs_vars() {
        for key in SQS_VARS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test production (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::set_var("APP_ENV", " Development ");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var("APP_ENV", "staging");
        assert_eq!(Environment::from_env(), Environment::Staging);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    fn test_docs_and_log_format_by_environment() {
        assert!(!Environment::Production.show_api_docs());
        assert!(Environment::Staging.show_api_docs());
        assert!(Environment::Development.show_api_docs());

        assert!(Environment::Production.json_logs());
        assert!(!Environment::Development.json_logs());
    }

    #[test]
    #[serial]
    fn test_endpoint_override() {
        env::remove_var("AWS_ENDPOINT_URL");
        assert_eq!(Environment::Production.override_aws_endpoint_url(), None);
        assert_eq!(
            Environment::Development.override_aws_endpoint_url(),
            Some(LOCALSTACK_ENDPOINT.to_string())
        );

        env::set_var("AWS_ENDPOINT_URL", "http://sqs.local:9324");
        assert_eq!(
            Environment::Development.override_aws_endpoint_url(),
            Some("http://sqs.local:9324".to_string())
        );
        env::remove_var("AWS_ENDPOINT_URL");
    }

    #[test]
    #[serial]
    fn test_queue_identity_from_env() {
        env::set_var("QUEUE_NAME", " orders ");
        env::remove_var("QUEUE_URL");
        let identity = Environment::Production.queue_identity();
        assert_eq!(identity, QueueIdentity::new("orders", ""));

        env::remove_var("QUEUE_NAME");
        assert!(!Environment::Production.queue_identity().is_bound());
    }

    #[test]
    #[serial]
    fn test_session_settings_defaults() {
        clear_sqs_vars();
        assert_eq!(
            Environment::Production.session_settings(),
            SessionSettings::default()
        );
    }

    #[test]
    #[serial]
    fn test_session_settings_overrides() {
        clear_sqs_vars();
        env::set_var("SQS_DEFAULT_GROUP_ID", "ops");
        env::set_var("SQS_OPERATION_TIMEOUT_SECONDS", "3");
        env::set_var("SQS_MAX_RECEIVE_MESSAGES", "50");
        env::set_var("SQS_RECEIVE_WAIT_SECONDS", "2");
        env::set_var("SQS_VISIBILITY_TIMEOUT_SECONDS", "5");
        env::set_var("SQS_SINGLE_CALL_RECEIVE", "Yes");
        env::set_var("SQS_RESOLUTION_BACKOFF_MS", "250");

        let settings = Environment::Production.session_settings();

        assert_eq!(settings.default_group_id, "ops");
        assert_eq!(settings.operation_timeout, Duration::from_secs(3));
        assert_eq!(settings.max_receive_messages, 10);
        assert_eq!(settings.receive_wait_seconds, 2);
        assert_eq!(settings.visibility_timeout_seconds, 5);
        assert!(settings.single_call_receive);
        assert_eq!(settings.resolution_backoff, Duration::from_millis(250));

        clear_sqs_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back_to_defaults() {
        clear_sqs_vars();
        env::set_var("SQS_OPERATION_TIMEOUT_SECONDS", "soon");
        env::set_var("SQS_MAX_RECEIVE_MESSAGES", "-4");
        env::set_var("SQS_VISIBILITY_TIMEOUT_SECONDS", "0");
        env::set_var("SQS_SINGLE_CALL_RECEIVE", "maybe");

        let settings = Environment::Production.session_settings();
        let defaults = SessionSettings::default();

        assert_eq!(settings.operation_timeout, defaults.operation_timeout);
        assert_eq!(settings.max_receive_messages, defaults.max_receive_messages);
        assert_eq!(
            settings.visibility_timeout_seconds,
            defaults.visibility_timeout_seconds
        );
        assert_eq!(settings.single_call_receive, defaults.single_call_receive);

        clear_sqs_vars();
    }

    #[test]
    #[serial]
    fn test_tracing_level() {
        env::set_var("LOG_LEVEL", "DEBUG");
        assert_eq!(Environment::Production.tracing_level(), Level::DEBUG);
        env::set_var("LOG_LEVEL", "warning");
        assert_eq!(Environment::Production.tracing_level(), Level::WARN);
        env::set_var("LOG_LEVEL", "verbose");
        assert_eq!(Environment::Production.tracing_level(), Level::INFO);
        env::remove_var("LOG_LEVEL");
    }
}
