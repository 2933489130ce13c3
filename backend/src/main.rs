use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use queue_session::{BackendConnector, QueueSession, Switchboard};
use sqs_ui::{server, types::Environment, version};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

/// Web console for a single SQS queue
#[derive(Debug, Parser)]
#[command(name = "sqs-ui", disable_version_flag = true)]
struct Cli {
    /// Print version information and exit
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Directory with the static UI files
    #[arg(long, env = "WEB_DIR", default_value = "web")]
    web_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", version::banner());
        return Ok(());
    }

    let environment = Environment::from_env();

    // RUST_LOG wins; LOG_LEVEL is the fallback
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();

    // Use JSON format for staging/production, regular format for development
    if environment.json_logs() {
        fmt().json().with_env_filter(env_filter).init();
    } else {
        fmt().with_env_filter(env_filter).init();
    }

    tracing::info!(
        environment = %environment,
        version = version::VERSION,
        commit = version::COMMIT,
        "Starting SQS UI"
    );

    let identity = environment.queue_identity();
    let settings = environment.session_settings();
    let connector = Arc::new(environment.sqs_connector());

    let backend = connector.connect(&identity).await?;
    let session = QueueSession::connect(identity, backend, settings.clone()).await;
    let switchboard = Arc::new(Switchboard::new(session, connector, settings));

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        signal_shutdown.cancel();
    });

    server::start(environment, switchboard, cli.port, &cli.web_dir, shutdown).await?;

    tracing::info!("SQS UI stopped");
    Ok(())
}
