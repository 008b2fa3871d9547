//! Notification storage trait

use anyhow::Result;

use super::models::{NewNotification, Notification, NotificationType};
use crate::social_store::UserId;

/// Trait for notification storage operations
pub trait NotificationStore: Send + Sync {
    /// Create a notification with server assigned id and timestamps.
    /// `is_read` always starts as false.
    fn create_notification(&self, notification: &NewNotification) -> Result<Notification>;

    /// Create a notification whose `created_at` and `updated_at` are both `timestamp`.
    /// Used by fan-out so that every derived notification shares the source timestamp.
    fn create_notification_at(
        &self,
        notification: &NewNotification,
        timestamp: i64,
    ) -> Result<Notification>;

    /// Like [`create_notification_at`](Self::create_notification_at), but returns `None`
    /// instead of inserting when the store already holds the same like notification.
    fn create_notification_once(
        &self,
        notification: &NewNotification,
        timestamp: i64,
    ) -> Result<Option<Notification>>;

    /// Oldest notification with the same recipient, triggering user, type and entity.
    fn find_matching_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Option<Notification>>;

    /// Get all notifications for a user, newest first.
    fn get_user_notifications(&self, user_id: UserId) -> Result<Vec<Notification>>;

    fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>>;

    /// Mark a notification as read, refreshing `updated_at`.
    /// Returns false if the notification doesn't exist.
    fn mark_notification_read(&self, notification_id: i64) -> Result<bool>;

    /// Mark every unread notification of a user as read. Returns the number of rows changed.
    fn mark_all_notifications_read(&self, user_id: UserId) -> Result<usize>;

    /// Returns false if there was nothing to delete.
    fn delete_notification(&self, notification_id: i64) -> Result<bool>;

    /// Delete the notifications matching recipient, triggering user, type and entity.
    fn delete_matching_notifications(
        &self,
        recipient_user_id: UserId,
        triggering_user_id: UserId,
        notification_type: NotificationType,
        entity_id: &str,
    ) -> Result<usize>;

    /// Get count of unread notifications for a user.
    fn get_unread_count(&self, user_id: UserId) -> Result<usize>;

    /// Delete read notifications created before `before_timestamp`.
    fn prune_read_notifications(&self, before_timestamp: i64) -> Result<usize>;
}
