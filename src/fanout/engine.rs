use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{FanOutContext, FanOutError, FanOutReport, FanOutTask};
use crate::notifications::{NewNotification, NotificationType};
use crate::server::metrics::{record_notification_created, record_notification_insert_failure};
use crate::social_store::{FullStore, PostId, UserId};

/// Turns fan-out tasks into notification rows.
///
/// Stateless between runs: every decision is taken from a fresh read of the store.
/// Runs synchronously and is meant to be called from a blocking worker thread.
pub struct FanOutEngine {
    store: Arc<dyn FullStore>,
}

/// Dedups `candidates` preserving order, dropping the actor.
/// Returns the recipients and how many candidates were dropped.
pub fn resolve_recipients(actor_id: UserId, candidates: Vec<UserId>) -> (Vec<UserId>, usize) {
    let total = candidates.len();
    let mut seen = HashSet::with_capacity(total);
    let recipients: Vec<UserId> = candidates
        .into_iter()
        .filter(|id| *id != actor_id && seen.insert(*id))
        .collect();
    let skipped = total - recipients.len();
    (recipients, skipped)
}

impl FanOutEngine {
    pub fn new(store: Arc<dyn FullStore>) -> Self {
        Self { store }
    }

    pub fn execute(
        &self,
        task: &FanOutTask,
        ctx: &FanOutContext,
    ) -> Result<FanOutReport, FanOutError> {
        ctx.check()?;
        match *task {
            FanOutTask::NewPost {
                author_id,
                post_id,
                created_at,
            } => self.fan_out_new_post(author_id, post_id, created_at, ctx),
            FanOutTask::Like { post_id, liker_id } => self.notify_like(post_id, liker_id, ctx),
            FanOutTask::LikeRemoved {
                post_id,
                unliker_id,
            } => self.remove_like_notification(post_id, unliker_id),
            FanOutTask::Follow {
                follower_id,
                followed_id,
            } => self.notify_follow(follower_id, followed_id, ctx),
        }
    }

    fn fan_out_new_post(
        &self,
        author_id: UserId,
        post_id: PostId,
        created_at: i64,
        ctx: &FanOutContext,
    ) -> Result<FanOutReport, FanOutError> {
        let followers = self
            .store
            .get_follower_ids(author_id)
            .map_err(FanOutError::RecipientQuery)?;

        if followers.is_empty() {
            debug!("Author {} has no followers, nothing to fan out", author_id);
            return Ok(FanOutReport::default());
        }

        let (recipients, skipped) = resolve_recipients(author_id, followers);
        let mut report = FanOutReport {
            recipients: recipients.len(),
            skipped,
            ..Default::default()
        };
        debug!(
            "Fanning out post {} by {} to {} followers",
            post_id, author_id, report.recipients
        );

        let template = NewNotification::new(author_id, NotificationType::NewPost)
            .triggered_by(author_id)
            .about(post_id);

        for recipient in recipients {
            if let Err(err) = ctx.check() {
                warn!(
                    "Fan-out of post {} stopped after {} of {} recipients: {}",
                    post_id, report.inserted, report.recipients, err
                );
                return Err(err);
            }

            let notification = NewNotification {
                recipient_user_id: recipient,
                ..template.clone()
            };
            match self.store.create_notification_at(&notification, created_at) {
                Ok(_) => {
                    report.inserted += 1;
                    record_notification_created(NotificationType::NewPost);
                }
                Err(err) => {
                    report.failed += 1;
                    record_notification_insert_failure(NotificationType::NewPost);
                    warn!(
                        "Failed to insert new_post notification for recipient {}: {:#}",
                        recipient, err
                    );
                }
            }
        }

        info!(
            "Fan-out of post {} done: {} inserted, {} failed, {} skipped",
            post_id, report.inserted, report.failed, report.skipped
        );
        Ok(report)
    }

    fn notify_like(
        &self,
        post_id: PostId,
        liker_id: UserId,
        ctx: &FanOutContext,
    ) -> Result<FanOutReport, FanOutError> {
        let Some(author_id) = self
            .store
            .get_post_author(post_id)
            .map_err(FanOutError::AuthorLookup)?
        else {
            debug!("Post {} is gone, skipping like notification", post_id);
            return Ok(FanOutReport::default());
        };

        if author_id == liker_id {
            return Ok(FanOutReport {
                skipped: 1,
                ..Default::default()
            });
        }

        if !self.is_liked(post_id, liker_id)? {
            debug!(
                "Like of {} on post {} was withdrawn, skipping notification",
                liker_id, post_id
            );
            return Ok(FanOutReport {
                skipped: 1,
                ..Default::default()
            });
        }

        ctx.check()?;
        let notification = NewNotification::new(author_id, NotificationType::Like)
            .triggered_by(liker_id)
            .about(post_id);
        let mut report = FanOutReport {
            recipients: 1,
            ..Default::default()
        };
        match self
            .store
            .create_notification_once(&notification, chrono::Utc::now().timestamp())
        {
            Ok(Some(created)) => {
                report.inserted = 1;
                record_notification_created(NotificationType::Like);
                debug!(
                    "Inserted like notification {} for user {}",
                    created.id, author_id
                );
            }
            Ok(None) => {
                report.skipped = 1;
                debug!(
                    "User {} already notified of like by {} on post {}",
                    author_id, liker_id, post_id
                );
            }
            Err(err) => {
                report.failed = 1;
                record_notification_insert_failure(NotificationType::Like);
                warn!(
                    "Failed to insert like notification for user {}: {:#}",
                    author_id, err
                );
            }
        }

        // An unlike may have landed while inserting, with its cleanup already done
        if report.inserted > 0 && !self.is_liked(post_id, liker_id)? {
            report.removed = self.delete_like_notification(author_id, post_id, liker_id)?;
        }
        Ok(report)
    }

    fn is_liked(&self, post_id: PostId, user_id: UserId) -> Result<bool, FanOutError> {
        self.store
            .is_post_liked(post_id, user_id)
            .map_err(FanOutError::Store)
    }

    fn delete_like_notification(
        &self,
        author_id: UserId,
        post_id: PostId,
        liker_id: UserId,
    ) -> Result<usize, FanOutError> {
        self.store
            .delete_matching_notifications(
                author_id,
                liker_id,
                NotificationType::Like,
                &post_id.to_string(),
            )
            .map_err(FanOutError::Store)
    }

    fn remove_like_notification(
        &self,
        post_id: PostId,
        unliker_id: UserId,
    ) -> Result<FanOutReport, FanOutError> {
        let Some(author_id) = self
            .store
            .get_post_author(post_id)
            .map_err(FanOutError::AuthorLookup)?
        else {
            return Ok(FanOutReport::default());
        };

        if self.is_liked(post_id, unliker_id)? {
            debug!(
                "Post {} was liked again by {}, keeping like notification",
                post_id, unliker_id
            );
            return Ok(FanOutReport {
                skipped: 1,
                ..Default::default()
            });
        }

        let removed = self.delete_like_notification(author_id, post_id, unliker_id)?;
        debug!(
            "Removed {} like notifications of {} on post {}",
            removed, unliker_id, post_id
        );
        Ok(FanOutReport {
            removed,
            ..Default::default()
        })
    }

    fn notify_follow(
        &self,
        follower_id: UserId,
        followed_id: UserId,
        ctx: &FanOutContext,
    ) -> Result<FanOutReport, FanOutError> {
        if follower_id == followed_id {
            return Ok(FanOutReport {
                skipped: 1,
                ..Default::default()
            });
        }

        ctx.check()?;
        let notification = NewNotification::new(followed_id, NotificationType::Follow)
            .triggered_by(follower_id)
            .about(follower_id);
        Ok(self.insert_single(&notification))
    }

    fn insert_single(&self, notification: &NewNotification) -> FanOutReport {
        let mut report = FanOutReport {
            recipients: 1,
            ..Default::default()
        };
        match self.store.create_notification(notification) {
            Ok(created) => {
                report.inserted = 1;
                record_notification_created(created.notification_type);
                debug!(
                    "Inserted {} notification {} for user {}",
                    created.notification_type, created.id, created.recipient_user_id
                );
            }
            Err(err) => {
                report.failed = 1;
                record_notification_insert_failure(notification.notification_type);
                warn!(
                    "Failed to insert {} notification for user {}: {:#}",
                    notification.notification_type, notification.recipient_user_id, err
                );
            }
        }
        report
    }
}
