use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

use super::state::ServerState;
use crate::error::SocialError;
use crate::notifications::{NewNotification, NotificationService};
use crate::social_store::UserId;

#[derive(Serialize)]
struct UnreadCountResponse {
    unread: usize,
}

#[derive(Serialize)]
struct MarkAllReadResponse {
    updated: usize,
}

/// Malformed path identifiers are rejected before the store is reached.
pub(super) fn path_id(path: Result<Path<i64>, PathRejection>, what: &str) -> Result<i64, SocialError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            debug!("Rejected {} path parameter: {}", what, rejection.body_text());
            Err(SocialError::invalid(format!("invalid {}", what)))
        }
    }
}

pub(super) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, SocialError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(SocialError::invalid(rejection.body_text())),
    }
}

async fn create_notification(
    State(notifications): State<NotificationService>,
    body: Result<Json<NewNotification>, JsonRejection>,
) -> Result<Response, SocialError> {
    let new_notification = json_body(body)?;
    let notification = notifications.create(new_notification).await?;
    Ok((StatusCode::CREATED, Json(notification)).into_response())
}

async fn get_user_notifications(
    State(notifications): State<NotificationService>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> Result<Response, SocialError> {
    let user_id = path_id(user_id, "user id")?;
    let list = notifications.list_by_user(user_id).await?;
    Ok(Json(list).into_response())
}

async fn get_unread_count(
    State(notifications): State<NotificationService>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> Result<Response, SocialError> {
    let user_id = path_id(user_id, "user id")?;
    let unread = notifications.unread_count(user_id).await?;
    Ok(Json(UnreadCountResponse { unread }).into_response())
}

async fn mark_as_read(
    State(notifications): State<NotificationService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, SocialError> {
    let id = path_id(id, "notification id")?;
    notifications.mark_as_read(id).await?;
    Ok(StatusCode::OK)
}

async fn mark_all_as_read(
    State(notifications): State<NotificationService>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> Result<Response, SocialError> {
    let user_id = path_id(user_id, "user id")?;
    let updated = notifications.mark_all_as_read(user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }).into_response())
}

async fn delete_notification(
    State(notifications): State<NotificationService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, SocialError> {
    let id = path_id(id, "notification id")?;
    notifications.delete(id).await?;
    Ok(StatusCode::OK)
}

pub fn make_notification_routes(state: ServerState) -> Router {
    Router::new()
        .route("/notifications", post(create_notification))
        .route("/notifications/user/{user_id}", get(get_user_notifications))
        .route(
            "/notifications/user/{user_id}/unread-count",
            get(get_unread_count),
        )
        .route("/notifications/user/{user_id}/read-all", put(mark_all_as_read))
        .route("/notifications/{id}/read", put(mark_as_read))
        .route("/notifications/{id}", delete(delete_notification))
        .with_state(state)
}
