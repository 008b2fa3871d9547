use serde::Serialize;
use std::time::Duration;

use crate::config::FanOutSettings;
use crate::social_store::{PostId, UserId};

/// Work handed from a trigger to the fan-out engine.
///
/// Tasks carry only ids and the source timestamp. Everything else is read fresh
/// from the store when the task runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutTask {
    /// Notify every follower of `author_id` about a new post.
    NewPost {
        author_id: UserId,
        post_id: PostId,
        created_at: i64,
    },
    /// Notify the author of `post_id` that `liker_id` liked it.
    Like { post_id: PostId, liker_id: UserId },
    /// Remove the like notification created for `liker_id` on `post_id`.
    LikeRemoved {
        post_id: PostId,
        unliker_id: UserId,
    },
    /// Notify `followed_id` about a new follower.
    Follow {
        follower_id: UserId,
        followed_id: UserId,
    },
}

impl FanOutTask {
    pub fn kind(&self) -> &'static str {
        match self {
            FanOutTask::NewPost { .. } => "new_post",
            FanOutTask::Like { .. } => "like",
            FanOutTask::LikeRemoved { .. } => "like_removed",
            FanOutTask::Follow { .. } => "follow",
        }
    }

    /// The user whose action caused the task.
    pub fn actor_id(&self) -> UserId {
        match self {
            FanOutTask::NewPost { author_id, .. } => *author_id,
            FanOutTask::Like { liker_id, .. } => *liker_id,
            FanOutTask::LikeRemoved { unliker_id, .. } => *unliker_id,
            FanOutTask::Follow { follower_id, .. } => *follower_id,
        }
    }

    pub fn deadline(&self, settings: &FanOutSettings) -> Duration {
        match self {
            FanOutTask::NewPost { .. } => settings.new_post_timeout,
            FanOutTask::Like { .. } | FanOutTask::LikeRemoved { .. } => settings.like_timeout,
            FanOutTask::Follow { .. } => settings.follow_timeout,
        }
    }
}

/// Outcome of one fan-out run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    /// Recipients left after dedup and actor exclusion.
    pub recipients: usize,
    pub inserted: usize,
    pub failed: usize,
    /// Candidates dropped without an insert, such as the actor or a repeated like.
    pub skipped: usize,
    pub removed: usize,
}
