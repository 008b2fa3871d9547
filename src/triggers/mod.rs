//! Entry points of the social actions that may produce notifications.

mod actions;

pub use actions::{FollowOutcome, LikeOutcome, SocialActions};
