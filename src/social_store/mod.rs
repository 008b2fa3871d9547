mod deadline;
#[cfg(any(test, feature = "test-utils"))]
mod flaky_store;
mod models;
mod notification_queries;
mod schema;
mod store;
mod trait_def;

pub use deadline::{run_bounded, StoreTimeouts};
#[cfg(any(test, feature = "test-utils"))]
pub use flaky_store::FlakyStore;
pub use models::{Account, NewPost, Post, PostId, UserId};
pub use store::SqliteSocialStore;
pub use trait_def::SocialStore;

use crate::notifications::NotificationStore;

/// Everything the triggers and the fan-out engine need from persistence.
pub trait FullStore: SocialStore + NotificationStore {}

impl<T: SocialStore + NotificationStore> FullStore for T {}
