use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::SocialError;
use crate::fanout::{EventSink, FanOutQueue, FanOutTask, SocialEvent};
use crate::social_store::{
    run_bounded, Account, FullStore, NewPost, Post, PostId, StoreTimeouts, UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    /// Like state after the call.
    pub liked: bool,
    /// True only if this call created the like.
    pub newly_liked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowOutcome {
    pub account: Account,
    pub newly_followed: bool,
}

/// The synchronous part of every social action.
///
/// Each method performs the primary write within the caller's request and, when
/// warranted, hands a [`FanOutTask`] to the queue without waiting on it.
pub struct SocialActions {
    store: Arc<dyn FullStore>,
    queue: Arc<dyn FanOutQueue>,
    events: Arc<dyn EventSink>,
    timeouts: StoreTimeouts,
}

impl SocialActions {
    pub fn new(
        store: Arc<dyn FullStore>,
        queue: Arc<dyn FanOutQueue>,
        events: Arc<dyn EventSink>,
        timeouts: StoreTimeouts,
    ) -> Self {
        Self {
            store,
            queue,
            events,
            timeouts,
        }
    }

    pub async fn create_account(&self, handle: String) -> Result<Account, SocialError> {
        let handle = handle.trim().to_string();
        if handle.is_empty() {
            return Err(SocialError::invalid("handle must not be empty"));
        }

        let store = self.store.clone();
        let lookup = handle.clone();
        let existing = run_bounded("find_account_by_handle", self.timeouts.single_row, move || {
            store.find_account_by_handle(&lookup)
        })
        .await?;
        if existing.is_some() {
            return Err(SocialError::invalid(format!("handle '{}' is taken", handle)));
        }

        let store = self.store.clone();
        let account = run_bounded("create_account", self.timeouts.single_row, move || {
            store.create_account(&handle)
        })
        .await?;
        info!("Created account {} ({})", account.id, account.handle);
        Ok(account)
    }

    pub async fn create_post(&self, actor: UserId, post: NewPost) -> Result<Post, SocialError> {
        if post.title.trim().is_empty() {
            return Err(SocialError::invalid("post title must not be empty"));
        }

        let store = self.store.clone();
        let created = run_bounded("create_post", self.timeouts.single_row, move || {
            store.create_post(actor, &post)
        })
        .await?;
        info!("User {} created post {}", actor, created.id);

        self.queue.submit(FanOutTask::NewPost {
            author_id: actor,
            post_id: created.id,
            created_at: created.created_at,
        });
        self.events.publish(&SocialEvent::PostCreated {
            post_id: created.id,
            author_id: actor,
            title: created.title.clone(),
            created_at: created.created_at,
        });
        Ok(created)
    }

    pub async fn like_post(&self, actor: UserId, post_id: PostId) -> Result<LikeOutcome, SocialError> {
        let store = self.store.clone();
        let author_id = run_bounded("get_post_author", self.timeouts.single_row, move || {
            store.get_post_author(post_id)
        })
        .await?
        .ok_or_else(|| SocialError::not_found("post", post_id))?;

        let store = self.store.clone();
        let newly_liked = run_bounded("insert_like", self.timeouts.single_row, move || {
            store.insert_like(post_id, actor)
        })
        .await?;

        let store = self.store.clone();
        let liked = run_bounded("is_post_liked", self.timeouts.single_row, move || {
            store.is_post_liked(post_id, actor)
        })
        .await?;

        if newly_liked && liked {
            if author_id != actor {
                self.queue.submit(FanOutTask::Like {
                    post_id,
                    liker_id: actor,
                });
            }
            self.events.publish(&SocialEvent::PostLiked {
                post_id,
                user_id: actor,
            });
        } else {
            debug!("User {} already liked post {}", actor, post_id);
        }

        Ok(LikeOutcome { liked, newly_liked })
    }

    /// Returns true if a like existed and was removed.
    pub async fn unlike_post(&self, actor: UserId, post_id: PostId) -> Result<bool, SocialError> {
        let store = self.store.clone();
        let removed = run_bounded("delete_like", self.timeouts.single_row, move || {
            store.delete_like(post_id, actor)
        })
        .await?;

        if removed == 0 {
            debug!("User {} had not liked post {}", actor, post_id);
            return Ok(false);
        }

        self.queue.submit(FanOutTask::LikeRemoved {
            post_id,
            unliker_id: actor,
        });
        Ok(true)
    }

    pub async fn follow_user(
        &self,
        actor: UserId,
        target: UserId,
    ) -> Result<FollowOutcome, SocialError> {
        if actor == target {
            return Err(SocialError::invalid("cannot follow yourself"));
        }

        let store = self.store.clone();
        let account = run_bounded("get_account", self.timeouts.single_row, move || {
            store.get_account(target)
        })
        .await?
        .ok_or_else(|| SocialError::not_found("account", target))?;

        let store = self.store.clone();
        let newly_followed = run_bounded("insert_follow", self.timeouts.single_row, move || {
            store.insert_follow(actor, target)
        })
        .await?;

        if newly_followed {
            info!("User {} now follows {}", actor, target);
            self.queue.submit(FanOutTask::Follow {
                follower_id: actor,
                followed_id: target,
            });
            self.events.publish(&SocialEvent::UserFollowed {
                follower_id: actor,
                followed_id: target,
            });
        }

        Ok(FollowOutcome {
            account,
            newly_followed,
        })
    }

    /// Returns true if the follow edge existed and was removed.
    pub async fn unfollow_user(&self, actor: UserId, target: UserId) -> Result<bool, SocialError> {
        if actor == target {
            return Err(SocialError::invalid("cannot unfollow yourself"));
        }

        let store = self.store.clone();
        let removed = run_bounded("delete_follow", self.timeouts.single_row, move || {
            store.delete_follow(actor, target)
        })
        .await?;
        Ok(removed > 0)
    }
}
