use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sia_social_server::config::{self, EventSinkKind};
use sia_social_server::fanout::{
    BroadcastEventSink, EventSink, FanOutEngine, FanOutWorkerPool, LogEventSink, NoopEventSink,
};
use sia_social_server::notifications::{spawn_notification_pruning, NotificationService};
use sia_social_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use sia_social_server::social_store::SqliteSocialStore;
use sia_social_server::triggers::SocialActions;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing the social.db database file.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Number of days to keep read notifications. Set to 0 to disable pruning.
    #[clap(long, default_value_t = 30)]
    pub notification_retention_days: u64,

    /// Interval in hours between pruning runs. Only used if notification_retention_days > 0.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,

    /// Where social events are published besides the notification fan-out.
    #[clap(long, default_value = "none")]
    pub event_sink: EventSinkKind,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level,
            notification_retention_days: args.notification_retention_days,
            prune_interval_hours: args.prune_interval_hours,
            event_sink: args.event_sink,
        }
    }
}

fn make_event_sink(kind: EventSinkKind, shutdown_token: &CancellationToken) -> Arc<dyn EventSink> {
    match kind {
        EventSinkKind::None => Arc::new(NoopEventSink),
        EventSinkKind::Log => Arc::new(LogEventSink),
        EventSinkKind::Broadcast => {
            let sink = BroadcastEventSink::new(256);
            let mut receiver = sink.subscribe();
            let token = shutdown_token.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        event = receiver.recv() => match event {
                            Ok(event) => debug!("Broadcast event: {:?}", event),
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                                debug!("Broadcast subscriber lagged, skipped {} events", skipped)
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
            });
            Arc::new(sink)
        }
    }
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

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  fan-out workers: {}", app_config.fanout.workers);
    info!("  event sink: {:?}", app_config.event_sink);

    if !app_config.social_db_path().exists() {
        info!(
            "Creating new social database at {:?}",
            app_config.social_db_path()
        );
    }
    let store = Arc::new(SqliteSocialStore::with_busy_timeout(
        app_config.social_db_path(),
        app_config.store_timeouts.single_row,
    )?);

    // Initialize metrics system
    info!("Initializing metrics...");
    metrics::init_metrics();

    let shutdown_token = CancellationToken::new();

    let engine = Arc::new(FanOutEngine::new(store.clone()));
    let (pool, pool_handle) = FanOutWorkerPool::start(
        engine,
        app_config.fanout.clone(),
        shutdown_token.child_token(),
    );
    let pool = Arc::new(pool);

    if app_config.notification_retention_days > 0 {
        spawn_notification_pruning(
            store.clone(),
            app_config.notification_retention_days,
            app_config.prune_interval(),
            shutdown_token.child_token(),
        );
    }

    let events = make_event_sink(app_config.event_sink, &shutdown_token);
    let actions = SocialActions::new(
        store.clone(),
        pool.clone(),
        events,
        app_config.store_timeouts,
    );

    let state = ServerState {
        config: ServerConfig {
            requests_logging_level: app_config.logging_level,
            port: app_config.port,
            metrics_port: app_config.metrics_port,
            cors: app_config.cors.clone(),
        },
        start_time: Instant::now(),
        hash: env!("GIT_HASH").to_string(),
        notifications: NotificationService::new(store.clone(), app_config.store_timeouts),
        actions: Some(Arc::new(actions)),
    };

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating graceful shutdown");
            signal_token.cancel();
        }
    });

    let result = run_server(state, shutdown_token.clone()).await;
    info!("HTTP server stopped: {:?}", result);

    shutdown_token.cancel();
    pool.shutdown();
    if let Err(e) = pool_handle.await {
        info!("Fan-out dispatcher ended abnormally: {}", e);
    }
    result
}
