//! SQLite schema for the social store.
//!
//! Version 0 holds the base tables. Version 1 adds the composite index used when
//! listing a recipient's notifications newest first. Version 2 allows at most one
//! like notification per (recipient, liker, post).

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, PartialUniqueIndex, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::Result;
use rusqlite::Connection;

const ACCOUNT_FK: ForeignKey = ForeignKey {
    foreign_table: "accounts",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const POST_FK: ForeignKey = ForeignKey {
    foreign_table: "posts",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

pub const ACCOUNTS_TABLE_V_0: Table = Table {
    name: "accounts",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

pub const POSTS_TABLE_V_0: Table = Table {
    name: "posts",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "author_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ACCOUNT_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_posts_author_id", "author_id")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

pub const FOLLOWS_TABLE_V_0: Table = Table {
    name: "follows",
    columns: &[
        sqlite_column!(
            "follower_user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ACCOUNT_FK)
        ),
        sqlite_column!(
            "followed_user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ACCOUNT_FK)
        ),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_follows_followed_user_id", "followed_user_id")],
    unique_constraints: &[&["follower_user_id", "followed_user_id"]],
    partial_unique_indices: &[],
};

pub const LIKES_TABLE_V_0: Table = Table {
    name: "likes",
    columns: &[
        sqlite_column!(
            "post_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&POST_FK)
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ACCOUNT_FK)
        ),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[&["post_id", "user_id"]],
    partial_unique_indices: &[],
};

/// Notifications reference users and entities by value only, so the notification
/// service can run against its own database.
pub const NOTIFICATIONS_TABLE_V_0: Table = Table {
    name: "notifications",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("recipient_user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("triggering_user_id", &SqlType::Integer),
        sqlite_column!("notification_type", &SqlType::Text, non_null = true),
        sqlite_column!("entity_id", &SqlType::Text),
        sqlite_column!(
            "content",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("resource_url", &SqlType::Text),
        sqlite_column!(
            "is_read",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_notifications_recipient_id", "recipient_user_id")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

pub const NOTIFICATIONS_TABLE_V_1: Table = Table {
    name: "notifications",
    columns: NOTIFICATIONS_TABLE_V_0.columns,
    indices: &[
        ("idx_notifications_recipient_id", "recipient_user_id"),
        (
            "idx_notifications_recipient_created",
            "recipient_user_id, created_at DESC",
        ),
    ],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

pub const NOTIFICATIONS_TABLE_V_2: Table = Table {
    name: "notifications",
    columns: NOTIFICATIONS_TABLE_V_0.columns,
    indices: NOTIFICATIONS_TABLE_V_1.indices,
    unique_constraints: &[],
    partial_unique_indices: &[PartialUniqueIndex {
        name: "uniq_notifications_like",
        columns: "recipient_user_id, triggering_user_id, entity_id",
        predicate: "notification_type = 'like'",
    }],
};

/// Drops duplicate like notifications, keeping the oldest, then adds the unique index.
fn migrate_to_unique_like_notifications(conn: &Connection) -> Result<()> {
    let removed = conn.execute(
        "DELETE FROM notifications
         WHERE notification_type = 'like'
           AND id NOT IN (
             SELECT MIN(id) FROM notifications
             WHERE notification_type = 'like'
             GROUP BY recipient_user_id, triggering_user_id, entity_id
           )",
        [],
    )?;
    if removed > 0 {
        tracing::info!("Removed {} duplicate like notifications", removed);
    }
    NOTIFICATIONS_TABLE_V_2.create_indices(conn)
}

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            ACCOUNTS_TABLE_V_0,
            POSTS_TABLE_V_0,
            FOLLOWS_TABLE_V_0,
            LIKES_TABLE_V_0,
            NOTIFICATIONS_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            ACCOUNTS_TABLE_V_0,
            POSTS_TABLE_V_0,
            FOLLOWS_TABLE_V_0,
            LIKES_TABLE_V_0,
            NOTIFICATIONS_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| NOTIFICATIONS_TABLE_V_1.create_indices(conn)),
    },
    VersionedSchema {
        version: 2,
        tables: &[
            ACCOUNTS_TABLE_V_0,
            POSTS_TABLE_V_0,
            FOLLOWS_TABLE_V_0,
            LIKES_TABLE_V_0,
            NOTIFICATIONS_TABLE_V_2,
        ],
        migration: Some(migrate_to_unique_like_notifications),
    },
];
