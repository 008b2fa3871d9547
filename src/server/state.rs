use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;
use crate::notifications::NotificationService;
use crate::triggers::SocialActions;

pub type GuardedSocialActions = Arc<SocialActions>;
pub type OptionalSocialActions = Option<GuardedSocialActions>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub notifications: NotificationService,
    /// None when only the notification API is served.
    pub actions: OptionalSocialActions,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for NotificationService {
    fn from_ref(input: &ServerState) -> Self {
        input.notifications.clone()
    }
}

impl FromRef<ServerState> for OptionalSocialActions {
    fn from_ref(input: &ServerState) -> Self {
        input.actions.clone()
    }
}
