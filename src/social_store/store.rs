use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tracing::info;

use super::models::{Account, NewPost, Post, PostId, UserId};
use super::schema::VERSIONED_SCHEMAS;
use super::trait_def::SocialStore;
use crate::sqlite_persistence::open_versioned;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite backed store for the social graph and notifications.
#[derive(Clone)]
pub struct SqliteSocialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSocialStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        Self::with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens (or creates) the database. `busy_timeout` bounds how long a statement
    /// waits on a locked database before failing.
    pub fn with_busy_timeout<T: AsRef<Path>>(db_path: T, busy_timeout: Duration) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = if db_path.exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("Failed to open database at {:?}", db_path))?
        } else {
            info!("Creating new social database at {:?}", db_path);
            let conn = Connection::open(db_path)
                .with_context(|| format!("Failed to create database at {:?}", db_path))?;
            VERSIONED_SCHEMAS
                .last()
                .context("No schema defined")?
                .create(&conn)?;
            conn
        };

        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        conn.busy_timeout(busy_timeout)?;
        let version = open_versioned(&conn, VERSIONED_SCHEMAS)?;
        info!("Social database ready at version {}", version);

        Ok(SqliteSocialStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(super) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection mutex poisoned"))
    }
}

fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl SocialStore for SqliteSocialStore {
    fn create_account(&self, handle: &str) -> Result<Account> {
        let conn = self.conn()?;
        conn.query_row(
            "INSERT INTO accounts (handle, created_at) VALUES (?1, ?2) RETURNING id, handle, created_at",
            params![handle, now_timestamp()],
            |row| {
                Ok(Account {
                    id: row.get(0)?,
                    handle: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .with_context(|| format!("Failed to create account {}", handle))
    }

    fn get_account(&self, user_id: UserId) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, handle, created_at FROM accounts WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(Account {
                        id: row.get(0)?,
                        handle: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    fn find_account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, handle, created_at FROM accounts WHERE handle = ?1",
                params![handle],
                |row| {
                    Ok(Account {
                        id: row.get(0)?,
                        handle: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    fn create_post(&self, author_id: UserId, post: &NewPost) -> Result<Post> {
        let conn = self.conn()?;
        let now = now_timestamp();
        conn.query_row(
            "INSERT INTO posts (author_id, title, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING id, author_id, title, content, created_at, updated_at",
            params![author_id, post.title, post.content, now],
            row_to_post,
        )
        .with_context(|| format!("Failed to create post for author {}", author_id))
    }

    fn get_post(&self, post_id: PostId) -> Result<Option<Post>> {
        let conn = self.conn()?;
        let post = conn
            .query_row(
                "SELECT id, author_id, title, content, created_at, updated_at FROM posts WHERE id = ?1",
                params![post_id],
                row_to_post,
            )
            .optional()?;
        Ok(post)
    }

    fn get_post_author(&self, post_id: PostId) -> Result<Option<UserId>> {
        let conn = self.conn()?;
        let author = conn
            .query_row(
                "SELECT author_id FROM posts WHERE id = ?1",
                params![post_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(author)
    }

    fn insert_like(&self, post_id: PostId, user_id: UserId) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (post_id, user_id) DO NOTHING",
            params![post_id, user_id, now_timestamp()],
        )?;
        Ok(inserted == 1)
    }

    fn delete_like(&self, post_id: PostId, user_id: UserId) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
        Ok(removed)
    }

    fn is_post_liked(&self, post_id: PostId, user_id: UserId) -> Result<bool> {
        let conn = self.conn()?;
        let liked = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE post_id = ?1 AND user_id = ?2)",
            params![post_id, user_id],
            |row| row.get(0),
        )?;
        Ok(liked)
    }

    fn insert_follow(&self, follower_id: UserId, followed_id: UserId) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO follows (follower_user_id, followed_user_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (follower_user_id, followed_user_id) DO NOTHING",
            params![follower_id, followed_id, now_timestamp()],
        )?;
        Ok(inserted == 1)
    }

    fn delete_follow(&self, follower_id: UserId, followed_id: UserId) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM follows WHERE follower_user_id = ?1 AND followed_user_id = ?2",
            params![follower_id, followed_id],
        )?;
        Ok(removed)
    }

    fn is_following(&self, follower_id: UserId, followed_id: UserId) -> Result<bool> {
        let conn = self.conn()?;
        let following = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_user_id = ?1 AND followed_user_id = ?2)",
            params![follower_id, followed_id],
            |row| row.get(0),
        )?;
        Ok(following)
    }

    fn get_follower_ids(&self, user_id: UserId) -> Result<Vec<UserId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT follower_user_id FROM follows WHERE followed_user_id = ?1 ORDER BY created_at",
        )?;
        let followers = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<UserId>, _>>()?;
        Ok(followers)
    }
}
