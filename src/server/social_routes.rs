use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::notification_routes::{json_body, path_id};
use super::state::GuardedSocialActions;
use crate::error::SocialError;
use crate::social_store::{NewPost, PostId, UserId};

#[derive(Deserialize, Debug)]
struct CreateAccountBody {
    pub handle: String,
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: bool,
}

async fn create_account(
    State(actions): State<GuardedSocialActions>,
    body: Result<Json<CreateAccountBody>, JsonRejection>,
) -> Result<Response, SocialError> {
    let body = json_body(body)?;
    let account = actions.create_account(body.handle).await?;
    Ok((StatusCode::CREATED, Json(account)).into_response())
}

async fn create_post(
    Actor(actor): Actor,
    State(actions): State<GuardedSocialActions>,
    body: Result<Json<NewPost>, JsonRejection>,
) -> Result<Response, SocialError> {
    let new_post = json_body(body)?;
    let post = actions.create_post(actor, new_post).await?;
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

async fn like_post(
    Actor(actor): Actor,
    State(actions): State<GuardedSocialActions>,
    post_id: Result<Path<PostId>, PathRejection>,
) -> Result<Response, SocialError> {
    let post_id = path_id(post_id, "post id")?;
    let outcome = actions.like_post(actor, post_id).await?;
    Ok(Json(outcome).into_response())
}

async fn unlike_post(
    Actor(actor): Actor,
    State(actions): State<GuardedSocialActions>,
    post_id: Result<Path<PostId>, PathRejection>,
) -> Result<Response, SocialError> {
    let post_id = path_id(post_id, "post id")?;
    let removed = actions.unlike_post(actor, post_id).await?;
    Ok(Json(RemovedResponse { removed }).into_response())
}

async fn follow_user(
    Actor(actor): Actor,
    State(actions): State<GuardedSocialActions>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> Result<Response, SocialError> {
    let target = path_id(user_id, "user id")?;
    let outcome = actions.follow_user(actor, target).await?;
    Ok(Json(outcome).into_response())
}

async fn unfollow_user(
    Actor(actor): Actor,
    State(actions): State<GuardedSocialActions>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> Result<Response, SocialError> {
    let target = path_id(user_id, "user id")?;
    let removed = actions.unfollow_user(actor, target).await?;
    Ok(Json(RemovedResponse { removed }).into_response())
}

/// Trigger routes, mounted under `/v1`.
pub fn make_social_routes(actions: GuardedSocialActions) -> Router {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/posts", post(create_post))
        .route("/posts/{id}/like", post(like_post).delete(unlike_post))
        .route("/users/{id}/follow", post(follow_user).delete(unfollow_user))
        .with_state(actions)
}
