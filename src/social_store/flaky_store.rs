//! Fault injecting store wrapper.
//!
//! Delegates every call to an inner store, failing or slowing down selected
//! operations on request. Used to exercise partial failure paths of the fan-out.

use anyhow::{anyhow, bail, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::models::{Account, NewPost, Post, PostId, UserId};
use super::trait_def::SocialStore;
use crate::notifications::{NewNotification, Notification, NotificationStore, NotificationType};

pub struct FlakyStore<S> {
    inner: S,
    fail_follower_query: AtomicBool,
    failing_recipients: Mutex<HashSet<UserId>>,
    phantom_followers: Mutex<Vec<UserId>>,
    insert_delay_ms: AtomicU64,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        FlakyStore {
            inner,
            fail_follower_query: AtomicBool::new(false),
            failing_recipients: Mutex::new(HashSet::new()),
            phantom_followers: Mutex::new(Vec::new()),
            insert_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Makes `get_follower_ids` fail.
    pub fn fail_follower_query(&self, fail: bool) {
        self.fail_follower_query.store(fail, Ordering::SeqCst);
    }

    /// Makes notification inserts addressed to `user_id` fail.
    pub fn fail_notifications_for(&self, user_id: UserId) -> Result<()> {
        self.failing_recipients
            .lock()
            .map_err(|_| anyhow!("fault set poisoned"))?
            .insert(user_id);
        Ok(())
    }

    /// Appends `user_id` to every follower listing, on top of the real followers.
    pub fn add_phantom_follower(&self, user_id: UserId) -> Result<()> {
        self.phantom_followers
            .lock()
            .map_err(|_| anyhow!("fault set poisoned"))?
            .push(user_id);
        Ok(())
    }

    /// Sleeps before every notification insert.
    pub fn set_insert_delay(&self, delay: Duration) {
        self.insert_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn before_insert(&self, recipient: UserId) -> Result<()> {
        let delay = self.insert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        let failing = self
            .failing_recipients
            .lock()
            .map_err(|_| anyhow!("fault set poisoned"))?;
        if failing.contains(&recipient) {
            bail!("injected insert failure for recipient {}", recipient);
        }
        Ok(())
    }
}

impl<S: SocialStore> SocialStore for FlakyStore<S> {
    fn create_account(&self, handle: &str) -> Result<Account> {
        self.inner.create_account(handle)
    }

    fn get_account(&self, user_id: UserId) -> Result<Option<Account>> {
        self.inner.get_account(user_id)
    }

    fn find_account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        self.inner.find_account_by_handle(handle)
    }

    fn create_post(&self, author_id: UserId, post: &NewPost) -> Result<Post> {
        self.inner.create_post(author_id, post)
    }

    fn get_post(&self, post_id: PostId) -> Result<Option<Post>> {
        self.inner.get_post(post_id)
    }

    fn get_post_author(&self, post_id: PostId) -> Result<Option<UserId>> {
        self.inner.get_post_author(post_id)
    }

    fn insert_like(&self, post_id: PostId, user_id: UserId) -> Result<bool> {
        self.inner.insert_like(post_id, user_id)
    }

    fn delete_like(&self, post_id: PostId, user_id: UserId) -> Result<usize> {
        self.inner.delete_like(post_id, user_id)
    }

    fn is_post_liked(&self, post_id: PostId, user_id: UserId) -> Result<bool> {
        self.inner.is_post_liked(post_id, user_id)
    }

    fn insert_follow(&self, follower_id: UserId, followed_id: UserId) -> Result<bool> {
        self.inner.insert_follow(follower_id, followed_id)
    }

    fn delete_follow(&self, follower_id: UserId, followed_id: UserId) -> Result<usize> {
        self.inner.delete_follow(follower_id, followed_id)
    }

    fn is_following(&self, follower_id: UserId, followed_id: UserId) -> Result<bool> {
        self.inner.is_following(follower_id, followed_id)
    }

    fn get_follower_ids(&self, user_id: UserId) -> Result<Vec<UserId>> {
        if self.fail_follower_query.load(Ordering::SeqCst) {
            bail!("injected follower query failure");
        }
        let mut followers = self.inner.get_follower_ids(user_id)?;
        let phantoms = self
            .phantom_followers
            .lock()
            .map_err(|_| anyhow!("fault set poisoned"))?;
        followers.extend(phantoms.iter().copied());
        Ok(followers)
    }
}

impl<S: NotificationStore> NotificationStore for FlakyStore<S> {
    fn create_notification(&self, notification: &NewNotification) -> Result<Notification> {
        self.before_insert(notification.recipient_user_id)?;
        self.inner.create_notification(notification)
    }

    fn create_notification_at(
        &self,
        notification: &NewNotification,
        timestamp: i64,
    ) -> Result<Notification> {
        self.before_insert(notification.recipient_user_id)?;
        self.inner.create_notification_at(notification, timestamp)
    }

    fn create_notification_once(
        &self,
        notification: &NewNotification,
        timestamp: i64,
    ) -> Result<Option<Notification>> {
        self.before_insert(notification.recipient_user_id)?;
        self.inner.create_notification_once(notification, timestamp)
    }

    fn find_matching_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Option<Notification>> {
        self.inner.find_matching_notification(notification)
    }

    fn get_user_notifications(&self, user_id: UserId) -> Result<Vec<Notification>> {
        self.inner.get_user_notifications(user_id)
    }

    fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>> {
        self.inner.get_notification(notification_id)
    }

    fn mark_notification_read(&self, notification_id: i64) -> Result<bool> {
        self.inner.mark_notification_read(notification_id)
    }

    fn mark_all_notifications_read(&self, user_id: UserId) -> Result<usize> {
        self.inner.mark_all_notifications_read(user_id)
    }

    fn delete_notification(&self, notification_id: i64) -> Result<bool> {
        self.inner.delete_notification(notification_id)
    }

    fn delete_matching_notifications(
        &self,
        recipient_user_id: UserId,
        triggering_user_id: UserId,
        notification_type: NotificationType,
        entity_id: &str,
    ) -> Result<usize> {
        self.inner.delete_matching_notifications(
            recipient_user_id,
            triggering_user_id,
            notification_type,
            entity_id,
        )
    }

    fn get_unread_count(&self, user_id: UserId) -> Result<usize> {
        self.inner.get_unread_count(user_id)
    }

    fn prune_read_notifications(&self, before_timestamp: i64) -> Result<usize> {
        self.inner.prune_read_notifications(before_timestamp)
    }
}
