//! Test fixture creation for the social database

use super::constants::*;
use anyhow::Result;
use sia_social_server::social_store::{SocialStore, SqliteSocialStore, UserId};
use std::path::PathBuf;
use tempfile::TempDir;

/// Account ids of the seeded social graph
#[derive(Debug, Clone, Copy)]
pub struct SeededAccounts {
    pub author: UserId,
    pub followers: [UserId; 2],
    pub bystander: UserId,
}

/// Creates a temporary database with the seeded accounts.
/// Both followers follow the author; the bystander follows nobody.
///
/// Returns (temp_dir, db_path, accounts)
pub fn create_test_db_with_accounts() -> Result<(TempDir, PathBuf, SeededAccounts)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("social.db");

    let store = SqliteSocialStore::new(&db_path)?;
    let author = store.create_account(AUTHOR_HANDLE)?.id;
    let follower_a = store.create_account(FOLLOWER_HANDLES[0])?.id;
    let follower_b = store.create_account(FOLLOWER_HANDLES[1])?.id;
    let bystander = store.create_account(BYSTANDER_HANDLE)?.id;

    // Edges are inserted directly so no follow notifications exist at start
    store.insert_follow(follower_a, author)?;
    store.insert_follow(follower_b, author)?;

    Ok((
        dir,
        db_path,
        SeededAccounts {
            author,
            followers: [follower_a, follower_b],
            bystander,
        },
    ))
}
