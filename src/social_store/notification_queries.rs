use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::models::UserId;
use super::store::SqliteSocialStore;
use crate::notifications::{NewNotification, Notification, NotificationStore, NotificationType};

const NOTIFICATION_COLUMNS: &str = "id, recipient_user_id, triggering_user_id, notification_type, \
     entity_id, content, resource_url, is_read, created_at, updated_at";

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let type_str: String = row.get(3)?;
    let notification_type = type_str.parse::<NotificationType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(Notification {
        id: row.get(0)?,
        recipient_user_id: row.get(1)?,
        triggering_user_id: row.get(2)?,
        notification_type,
        entity_id: row.get(4)?,
        content: row.get(5)?,
        resource_url: row.get(6)?,
        is_read: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl NotificationStore for SqliteSocialStore {
    fn create_notification(&self, notification: &NewNotification) -> Result<Notification> {
        self.create_notification_at(notification, chrono::Utc::now().timestamp())
    }

    fn create_notification_at(
        &self,
        notification: &NewNotification,
        timestamp: i64,
    ) -> Result<Notification> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "INSERT INTO notifications
                 (recipient_user_id, triggering_user_id, notification_type, entity_id, content, resource_url, is_read, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
                 RETURNING {}",
                NOTIFICATION_COLUMNS
            ),
            params![
                notification.recipient_user_id,
                notification.triggering_user_id,
                notification.notification_type.as_str(),
                notification.entity_id,
                notification.content,
                notification.resource_url,
                timestamp,
            ],
            row_to_notification,
        )
        .with_context(|| {
            format!(
                "Failed to create {} notification for user {}",
                notification.notification_type, notification.recipient_user_id
            )
        })
    }

    fn create_notification_once(
        &self,
        notification: &NewNotification,
        timestamp: i64,
    ) -> Result<Option<Notification>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "INSERT INTO notifications
                 (recipient_user_id, triggering_user_id, notification_type, entity_id, content, resource_url, is_read, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
                 ON CONFLICT DO NOTHING
                 RETURNING {}",
                NOTIFICATION_COLUMNS
            ),
            params![
                notification.recipient_user_id,
                notification.triggering_user_id,
                notification.notification_type.as_str(),
                notification.entity_id,
                notification.content,
                notification.resource_url,
                timestamp,
            ],
            row_to_notification,
        )
        .optional()
        .with_context(|| {
            format!(
                "Failed to create {} notification for user {}",
                notification.notification_type, notification.recipient_user_id
            )
        })
    }

    fn find_matching_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Option<Notification>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {} FROM notifications
                     WHERE recipient_user_id = ?1 AND triggering_user_id IS ?2
                       AND notification_type = ?3 AND entity_id IS ?4
                     ORDER BY id LIMIT 1",
                    NOTIFICATION_COLUMNS
                ),
                params![
                    notification.recipient_user_id,
                    notification.triggering_user_id,
                    notification.notification_type.as_str(),
                    notification.entity_id,
                ],
                row_to_notification,
            )
            .optional()?;
        Ok(found)
    }

    fn get_user_notifications(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notifications WHERE recipient_user_id = ?1
             ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))?;
        let notifications = stmt
            .query_map(params![user_id], row_to_notification)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>> {
        let conn = self.conn()?;
        let notification = conn
            .query_row(
                &format!(
                    "SELECT {} FROM notifications WHERE id = ?1",
                    NOTIFICATION_COLUMNS
                ),
                params![notification_id],
                row_to_notification,
            )
            .optional()?;
        Ok(notification)
    }

    fn mark_notification_read(&self, notification_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE notifications SET is_read = 1, updated_at = ?2 WHERE id = ?1",
            params![notification_id, chrono::Utc::now().timestamp()],
        )?;
        Ok(updated > 0)
    }

    fn mark_all_notifications_read(&self, user_id: UserId) -> Result<usize> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE notifications SET is_read = 1, updated_at = ?2
             WHERE recipient_user_id = ?1 AND is_read = 0",
            params![user_id, chrono::Utc::now().timestamp()],
        )?;
        Ok(updated)
    }

    fn delete_notification(&self, notification_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM notifications WHERE id = ?1",
            params![notification_id],
        )?;
        Ok(deleted > 0)
    }

    fn delete_matching_notifications(
        &self,
        recipient_user_id: UserId,
        triggering_user_id: UserId,
        notification_type: NotificationType,
        entity_id: &str,
    ) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM notifications
             WHERE recipient_user_id = ?1 AND triggering_user_id = ?2
               AND notification_type = ?3 AND entity_id = ?4",
            params![
                recipient_user_id,
                triggering_user_id,
                notification_type.as_str(),
                entity_id
            ],
        )?;
        Ok(deleted)
    }

    fn get_unread_count(&self, user_id: UserId) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient_user_id = ?1 AND is_read = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn prune_read_notifications(&self, before_timestamp: i64) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM notifications WHERE is_read = 1 AND created_at < ?1",
            params![before_timestamp],
        )?;
        Ok(deleted)
    }
}
