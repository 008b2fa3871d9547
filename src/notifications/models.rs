//! Notification data models

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::social_store::UserId;

/// Notification type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Like,
    Comment,
    #[serde(alias = "new_follower")]
    Follow,
    Mention,
    Message,
    System,
    NewPost,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
            NotificationType::Follow => "follow",
            NotificationType::Mention => "mention",
            NotificationType::Message => "message",
            NotificationType::System => "system",
            NotificationType::NewPost => "new_post",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(NotificationType::Like),
            "comment" => Ok(NotificationType::Comment),
            "follow" | "new_follower" => Ok(NotificationType::Follow),
            "mention" => Ok(NotificationType::Mention),
            "message" => Ok(NotificationType::Message),
            "system" => Ok(NotificationType::System),
            "new_post" => Ok(NotificationType::NewPost),
            other => anyhow::bail!("Unknown notification type: {}", other),
        }
    }
}

/// A persisted notification, addressed to exactly one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_user_id: UserId,
    /// None for system notifications.
    pub triggering_user_id: Option<UserId>,
    pub notification_type: NotificationType,
    /// Post or user the notification refers to.
    pub entity_id: Option<String>,
    pub content: String,
    pub resource_url: Option<String>,
    pub is_read: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a notification.
///
/// Accepts the legacy field names used by older clients. Server-owned fields
/// (`id`, `is_read`, timestamps) are ignored if present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewNotification {
    #[serde(alias = "user_id")]
    pub recipient_user_id: UserId,
    #[serde(default, alias = "sender_id")]
    pub triggering_user_id: Option<UserId>,
    #[serde(alias = "type")]
    pub notification_type: NotificationType,
    #[serde(default, alias = "resource_id")]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub resource_url: Option<String>,
}

impl NewNotification {
    pub fn new(recipient_user_id: UserId, notification_type: NotificationType) -> Self {
        NewNotification {
            recipient_user_id,
            triggering_user_id: None,
            notification_type,
            entity_id: None,
            content: String::new(),
            resource_url: None,
        }
    }

    pub fn triggered_by(mut self, user_id: UserId) -> Self {
        self.triggering_user_id = Some(user_id);
        self
    }

    pub fn about(mut self, entity_id: impl ToString) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn is_self_notification(&self) -> bool {
        self.triggering_user_id == Some(self.recipient_user_id)
    }
}
