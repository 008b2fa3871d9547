//! Standalone notification API, without the social trigger routes.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sia_social_server::config;
use sia_social_server::notifications::{spawn_notification_pruning, NotificationService};
use sia_social_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use sia_social_server::social_store::SqliteSocialStore;

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directory containing the social.db database file.
    #[clap(long)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8082)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9092)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Number of days to keep read notifications. Set to 0 to disable pruning.
    #[clap(long, default_value_t = 0)]
    pub notification_retention_days: u64,

    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = config::CliConfig {
        db_dir: cli_args.db_dir.clone(),
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level,
        notification_retention_days: cli_args.notification_retention_days,
        prune_interval_hours: cli_args.prune_interval_hours,
        event_sink: config::EventSinkKind::None,
    };
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    let store = Arc::new(SqliteSocialStore::with_busy_timeout(
        app_config.social_db_path(),
        app_config.store_timeouts.single_row,
    )?);
    metrics::init_metrics();

    let shutdown_token = CancellationToken::new();
    if app_config.notification_retention_days > 0 {
        spawn_notification_pruning(
            store.clone(),
            app_config.notification_retention_days,
            app_config.prune_interval(),
            shutdown_token.child_token(),
        );
    }

    let state = ServerState {
        config: ServerConfig {
            requests_logging_level: app_config.logging_level,
            port: app_config.port,
            metrics_port: app_config.metrics_port,
            cors: app_config.cors.clone(),
        },
        start_time: Instant::now(),
        hash: env!("GIT_HASH").to_string(),
        notifications: NotificationService::new(store, app_config.store_timeouts),
        actions: None,
    };

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            signal_token.cancel();
        }
    });

    run_server(state, shutdown_token).await
}
