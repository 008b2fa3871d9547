//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database and fan-out pool.

use super::constants::*;
use super::fixtures::{create_test_db_with_accounts, SeededAccounts};
use sia_social_server::config::FanOutSettings;
use sia_social_server::fanout::{FanOutEngine, FanOutWorkerPool, NoopEventSink};
use sia_social_server::notifications::NotificationService;
use sia_social_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use sia_social_server::social_store::{FlakyStore, SqliteSocialStore, StoreTimeouts};
use sia_social_server::triggers::SocialActions;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub type TestStore = FlakyStore<SqliteSocialStore>;

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down, the fan-out pool stops and
/// temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Ids of the seeded accounts
    pub accounts: SeededAccounts,

    /// Store handle for direct database access and fault injection in tests
    pub store: Arc<TestStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    fanout_token: CancellationToken,
}

impl TestServer {
    /// Spawns a server exposing both the trigger routes and the notification API
    pub async fn spawn() -> Self {
        Self::spawn_inner(true).await
    }

    /// Spawns a server exposing only the notification API
    pub async fn spawn_notification_only() -> Self {
        Self::spawn_inner(false).await
    }

    async fn spawn_inner(with_actions: bool) -> Self {
        let (temp_db_dir, db_path, accounts) =
            create_test_db_with_accounts().expect("Failed to create test database");

        let store = Arc::new(FlakyStore::new(
            SqliteSocialStore::new(&db_path).expect("Failed to open social store"),
        ));
        let timeouts = StoreTimeouts::default();
        let fanout_token = CancellationToken::new();

        let actions = if with_actions {
            let engine = Arc::new(FanOutEngine::new(store.clone()));
            let (pool, _handle) = FanOutWorkerPool::start(
                engine,
                FanOutSettings::default(),
                fanout_token.clone(),
            );
            Some(Arc::new(SocialActions::new(
                store.clone(),
                Arc::new(pool),
                Arc::new(NoopEventSink),
                timeouts,
            )))
        } else {
            None
        };

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = ServerState {
            config: ServerConfig {
                port,
                requests_logging_level: RequestsLoggingLevel::None,
                ..ServerConfig::default()
            },
            start_time: Instant::now(),
            hash: "test".to_owned(),
            notifications: NotificationService::new(store.clone(), timeouts),
            actions,
        };
        let app = make_app(state);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            accounts,
            store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
            fanout_token,
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the / endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.fanout_token.cancel();
    }
}
