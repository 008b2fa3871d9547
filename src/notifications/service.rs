//! Notification service operations exposed over HTTP.
//!
//! Every call runs the store operation on the blocking pool under a deadline and
//! converts failures into [`SocialError`].

use anyhow::Context;
use std::sync::Arc;
use tracing::debug;

use super::models::{NewNotification, Notification};
use super::store::NotificationStore;
use crate::error::SocialError;
use crate::server::metrics::record_notification_created;
use crate::social_store::{run_bounded, StoreTimeouts, UserId};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    timeouts: StoreTimeouts,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, timeouts: StoreTimeouts) -> Self {
        NotificationService { store, timeouts }
    }

    pub async fn create(&self, notification: NewNotification) -> Result<Notification, SocialError> {
        if notification.is_self_notification() {
            return Err(SocialError::invalid(
                "recipient and triggering user must differ",
            ));
        }
        let store = self.store.clone();
        let now = chrono::Utc::now().timestamp();
        let (notification, inserted) =
            run_bounded("create_notification", self.timeouts.single_row, move || {
                match store.create_notification_once(&notification, now)? {
                    Some(created) => Ok((created, true)),
                    None => store
                        .find_matching_notification(&notification)?
                        .map(|existing| (existing, false))
                        .context("Duplicate notification disappeared"),
                }
            })
            .await?;
        if inserted {
            record_notification_created(notification.notification_type);
            debug!(
                "Created notification {} for user {}",
                notification.id, notification.recipient_user_id
            );
        } else {
            debug!(
                "Notification {} already exists for user {}",
                notification.id, notification.recipient_user_id
            );
        }
        Ok(notification)
    }

    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Notification>, SocialError> {
        let store = self.store.clone();
        run_bounded("get_user_notifications", self.timeouts.list, move || {
            store.get_user_notifications(user_id)
        })
        .await
    }

    /// Unknown ids are not an error.
    pub async fn mark_as_read(&self, notification_id: i64) -> Result<(), SocialError> {
        let store = self.store.clone();
        let updated = run_bounded("mark_notification_read", self.timeouts.single_row, move || {
            store.mark_notification_read(notification_id)
        })
        .await?;
        if !updated {
            debug!("Notification {} not found, nothing to mark", notification_id);
        }
        Ok(())
    }

    pub async fn mark_all_as_read(&self, user_id: UserId) -> Result<usize, SocialError> {
        let store = self.store.clone();
        run_bounded("mark_all_notifications_read", self.timeouts.list, move || {
            store.mark_all_notifications_read(user_id)
        })
        .await
    }

    pub async fn delete(&self, notification_id: i64) -> Result<(), SocialError> {
        let store = self.store.clone();
        run_bounded("delete_notification", self.timeouts.single_row, move || {
            store.delete_notification(notification_id)
        })
        .await?;
        Ok(())
    }

    pub async fn unread_count(&self, user_id: UserId) -> Result<usize, SocialError> {
        let store = self.store.clone();
        run_bounded("get_unread_count", self.timeouts.single_row, move || {
            store.get_unread_count(user_id)
        })
        .await
    }
}
