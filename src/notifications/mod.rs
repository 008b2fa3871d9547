//! User notifications module

mod models;
mod pruning;
mod service;
mod store;

pub use models::{NewNotification, Notification, NotificationType};
pub use pruning::{prune_once, retention_cutoff, spawn_notification_pruning};
pub use service::NotificationService;
pub use store::NotificationStore;
