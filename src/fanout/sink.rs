//! Publish-on-event hook for social actions.
//!
//! Kept apart from the fan-out engine: publishing never creates notifications and a
//! failing sink never affects the triggering request.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::social_store::{PostId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SocialEvent {
    PostCreated {
        post_id: PostId,
        author_id: UserId,
        title: String,
        created_at: i64,
    },
    PostLiked {
        post_id: PostId,
        user_id: UserId,
    },
    UserFollowed {
        follower_id: UserId,
        followed_id: UserId,
    },
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &SocialEvent);
}

/// Drops every event.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, event: &SocialEvent) {
        debug!("Dropping event {:?}", event);
    }
}

/// Writes every event to the log as JSON.
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn publish(&self, event: &SocialEvent) {
        match serde_json::to_string(event) {
            Ok(json) => info!("Social event: {}", json),
            Err(err) => debug!("Could not serialize event {:?}: {}", event, err),
        }
    }
}

/// Fans events out to in-process subscribers.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<SocialEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SocialEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: &SocialEvent) {
        // Err only means there are no subscribers right now
        if self.sender.send(event.clone()).is_err() {
            debug!("No subscribers for event {:?}", event);
        }
    }
}
