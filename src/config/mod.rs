mod file_config;

pub use file_config::{CorsConfig, EventsConfig, FanOutConfig, FileConfig, StoreConfig};

use crate::server::RequestsLoggingLevel;
use crate::social_store::StoreTimeouts;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

const MAX_RETENTION_DAYS: u64 = 100 * 366;
const MAX_PRUNE_INTERVAL_HOURS: u64 = 366 * 24;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub notification_retention_days: u64,
    pub prune_interval_hours: u64,
    pub event_sink: EventSinkKind,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub notification_retention_days: u64,
    pub prune_interval_hours: u64,

    // Feature configs (with defaults)
    pub store_timeouts: StoreTimeouts,
    pub fanout: FanOutSettings,
    pub event_sink: EventSinkKind,
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EventSinkKind {
    #[default]
    None,
    Log,
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutSettings {
    /// Maximum number of tasks running at once.
    pub workers: usize,
    pub queue_capacity: usize,
    pub new_post_timeout: Duration,
    /// Applies to like notifications and their cleanup.
    pub like_timeout: Duration,
    pub follow_timeout: Duration,
}

impl Default for FanOutSettings {
    fn default() -> Self {
        Self {
            workers: 8,
            queue_capacity: 1024,
            new_post_timeout: Duration::from_secs(30),
            like_timeout: Duration::from_secs(10),
            follow_timeout: Duration::from_secs(5),
        }
    }
}

/// Empty `allowed_origins` means any origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or(cli.logging_level);

        let notification_retention_days = file
            .notification_retention_days
            .unwrap_or(cli.notification_retention_days);
        let prune_interval_hours = file
            .prune_interval_hours
            .unwrap_or(cli.prune_interval_hours);
        if notification_retention_days > 0 && prune_interval_hours == 0 {
            bail!("prune_interval_hours must be greater than 0 when pruning is enabled");
        }
        if notification_retention_days > MAX_RETENTION_DAYS {
            bail!(
                "notification_retention_days must be at most {}",
                MAX_RETENTION_DAYS
            );
        }
        if prune_interval_hours > MAX_PRUNE_INTERVAL_HOURS {
            bail!(
                "prune_interval_hours must be at most {}",
                MAX_PRUNE_INTERVAL_HOURS
            );
        }

        let store_file = file.store.unwrap_or_default();
        let defaults = StoreTimeouts::default();
        let store_timeouts = StoreTimeouts {
            single_row: store_file
                .single_row_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.single_row),
            list: store_file
                .list_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.list),
        };

        let fanout_file = file.fanout.unwrap_or_default();
        let fanout_defaults = FanOutSettings::default();
        let fanout = FanOutSettings {
            workers: fanout_file.workers.unwrap_or(fanout_defaults.workers),
            queue_capacity: fanout_file
                .queue_capacity
                .unwrap_or(fanout_defaults.queue_capacity),
            new_post_timeout: fanout_file
                .new_post_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(fanout_defaults.new_post_timeout),
            like_timeout: fanout_file
                .like_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(fanout_defaults.like_timeout),
            follow_timeout: fanout_file
                .follow_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(fanout_defaults.follow_timeout),
        };
        if fanout.workers == 0 {
            bail!("fanout.workers must be at least 1");
        }
        if fanout.queue_capacity == 0 {
            bail!("fanout.queue_capacity must be at least 1");
        }

        let event_sink = match file.events.and_then(|e| e.sink) {
            Some(s) => match EventSinkKind::from_str(&s, true) {
                Ok(kind) => kind,
                Err(_) => bail!("Unknown event sink: {}", s),
            },
            None => cli.event_sink,
        };

        let cors = CorsSettings {
            allowed_origins: file
                .cors
                .and_then(|c| c.allowed_origins)
                .unwrap_or_default(),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            notification_retention_days,
            prune_interval_hours,
            store_timeouts,
            fanout,
            event_sink,
            cors,
        })
    }

    pub fn social_db_path(&self) -> PathBuf {
        self.db_dir.join("social.db")
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_hours.saturating_mul(60 * 60))
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
