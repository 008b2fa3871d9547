use anyhow::Result;

use super::models::{Account, NewPost, Post, PostId, UserId};

/// Persistence for the social graph: accounts, posts, likes and follows.
///
/// Like and follow inserts are idempotent. They report whether the row was newly
/// created, which is the signal used to decide whether a notification is due.
pub trait SocialStore: Send + Sync {
    fn create_account(&self, handle: &str) -> Result<Account>;

    fn get_account(&self, user_id: UserId) -> Result<Option<Account>>;

    fn find_account_by_handle(&self, handle: &str) -> Result<Option<Account>>;

    /// Insert a post, returning it with the id and creation timestamp assigned
    /// by the same statement.
    fn create_post(&self, author_id: UserId, post: &NewPost) -> Result<Post>;

    fn get_post(&self, post_id: PostId) -> Result<Option<Post>>;

    /// Author of the post, or None if the post doesn't exist.
    fn get_post_author(&self, post_id: PostId) -> Result<Option<UserId>>;

    /// Returns true only if this call created the like.
    fn insert_like(&self, post_id: PostId, user_id: UserId) -> Result<bool>;

    /// Returns the number of like rows removed.
    fn delete_like(&self, post_id: PostId, user_id: UserId) -> Result<usize>;

    fn is_post_liked(&self, post_id: PostId, user_id: UserId) -> Result<bool>;

    /// Returns true only if this call created the follow edge.
    fn insert_follow(&self, follower_id: UserId, followed_id: UserId) -> Result<bool>;

    /// Returns the number of follow edges removed.
    fn delete_follow(&self, follower_id: UserId, followed_id: UserId) -> Result<usize>;

    fn is_following(&self, follower_id: UserId, followed_id: UserId) -> Result<bool>;

    /// Ids of every account following `user_id`.
    fn get_follower_ids(&self, user_id: UserId) -> Result<Vec<UserId>>;
}
