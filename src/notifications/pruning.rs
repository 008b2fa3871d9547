use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::NotificationStore;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Timestamp before which read notifications are eligible for deletion.
pub fn retention_cutoff(now: i64, retention_days: u64) -> i64 {
    let retention = i64::try_from(retention_days)
        .unwrap_or(i64::MAX)
        .saturating_mul(SECONDS_PER_DAY);
    now.saturating_sub(retention)
}

/// Deletes read notifications older than the retention period once.
pub async fn prune_once(store: Arc<dyn NotificationStore>, retention_days: u64) -> usize {
    let cutoff = retention_cutoff(chrono::Utc::now().timestamp(), retention_days);
    match tokio::task::spawn_blocking(move || store.prune_read_notifications(cutoff)).await {
        Ok(Ok(count)) => {
            if count > 0 {
                info!("Pruned {} read notifications", count);
            }
            count
        }
        Ok(Err(e)) => {
            error!("Failed to prune notifications: {:#}", e);
            0
        }
        Err(e) => {
            error!("Notification pruning task failed: {}", e);
            0
        }
    }
}

/// Spawns a task that prunes every `interval` until `shutdown_token` is cancelled.
pub fn spawn_notification_pruning(
    store: Arc<dyn NotificationStore>,
    retention_days: u64,
    interval: Duration,
    shutdown_token: CancellationToken,
) -> JoinHandle<()> {
    info!(
        "Notification pruning enabled: retaining {} days, pruning every {:?}",
        retention_days, interval
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    prune_once(store.clone(), retention_days).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{NewNotification, NotificationType};
    use crate::social_store::SqliteSocialStore;
    use tempfile::TempDir;

    #[test]
    fn cutoff_subtracts_whole_days() {
        assert_eq!(retention_cutoff(10 * SECONDS_PER_DAY, 3), 7 * SECONDS_PER_DAY);
        assert_eq!(retention_cutoff(1000, 0), 1000);
    }

    #[test]
    fn cutoff_saturates_on_huge_retention() {
        assert_eq!(retention_cutoff(1000, u64::MAX), 1000 - i64::MAX);
        assert_eq!(retention_cutoff(-10, i64::MAX as u64), i64::MIN);
    }

    #[tokio::test]
    async fn prunes_old_read_notifications() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteSocialStore::new(temp_dir.path().join("social.db")).unwrap());
        let month_ago = chrono::Utc::now().timestamp() - 30 * SECONDS_PER_DAY;
        let old = store
            .create_notification_at(&NewNotification::new(1, NotificationType::System), month_ago)
            .unwrap();
        store
            .create_notification_at(&NewNotification::new(1, NotificationType::System), month_ago)
            .unwrap();
        store.mark_notification_read(old.id).unwrap();

        assert_eq!(prune_once(store.clone(), 7).await, 1);
        assert_eq!(store.get_user_notifications(1).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pruning_task_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteSocialStore::new(temp_dir.path().join("social.db")).unwrap());
        let token = CancellationToken::new();

        let handle =
            spawn_notification_pruning(store, 7, Duration::from_secs(3600), token.clone());
        token.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
