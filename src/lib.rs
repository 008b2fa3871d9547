//! SIA Social Server Library
//!
//! Social actions (posts, likes, follows), the asynchronous notification fan-out they
//! trigger and the notification API. Both binaries are thin wrappers around this crate.

pub mod config;
pub mod error;
pub mod fanout;
pub mod notifications;
pub mod server;
pub mod social_store;
pub mod sqlite_persistence;
pub mod triggers;

// Re-export commonly used types for convenience
pub use error::{ErrorCode, SocialError};
pub use notifications::{NotificationService, NotificationStore};
pub use server::{run_server, RequestsLoggingLevel};
pub use social_store::{SocialStore, SqliteSocialStore};
