//! End-to-end tests for likes and their notifications

mod common;

use common::{TestClient, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};
use sia_social_server::social_store::SocialStore;

async fn author_post(server: &TestServer) -> i64 {
    let author = TestClient::as_user(server.base_url.clone(), server.accounts.author);
    let response = author.create_post("likeable", "").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let post: Value = response.json().await.unwrap();
    post["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_like_notifies_author_once() {
    let server = TestServer::spawn().await;
    let post_id = author_post(&server).await;
    let fan = TestClient::as_user(server.base_url.clone(), server.accounts.bystander);

    let response = fan.like_post(post_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let first: Value = response.json().await.unwrap();
    assert_eq!(first, json!({"liked": true, "newly_liked": true}));

    let response = fan.like_post(post_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second: Value = response.json().await.unwrap();
    assert_eq!(second, json!({"liked": true, "newly_liked": false}));

    let notifications = fan
        .wait_for_notifications(server.accounts.author, 1)
        .await;
    assert_eq!(notifications[0]["notification_type"], "like");
    assert_eq!(notifications[0]["entity_id"], post_id.to_string());
    assert_eq!(
        notifications[0]["triggering_user_id"],
        server.accounts.bystander
    );

    let settled = fan
        .notifications_after_quiet_period(server.accounts.author)
        .await;
    assert_eq!(settled.len(), 1);
}

#[tokio::test]
async fn test_self_like_is_silent() {
    let server = TestServer::spawn().await;
    let post_id = author_post(&server).await;
    let author = TestClient::as_user(server.base_url.clone(), server.accounts.author);

    let response = author.like_post(post_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(author
        .notifications_after_quiet_period(server.accounts.author)
        .await
        .is_empty());
    assert!(server
        .store
        .is_post_liked(post_id, server.accounts.author)
        .unwrap());
}

#[tokio::test]
async fn test_unlike_removes_like_notification() {
    let server = TestServer::spawn().await;
    let post_id = author_post(&server).await;
    let fan = TestClient::as_user(server.base_url.clone(), server.accounts.bystander);

    fan.like_post(post_id).await;
    fan.wait_for_notifications(server.accounts.author, 1).await;

    let response = fan.unlike_post(post_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"removed": true}));

    fan.wait_for_no_notifications(server.accounts.author).await;
    assert!(!server
        .store
        .is_post_liked(post_id, server.accounts.bystander)
        .unwrap());
}

#[tokio::test]
async fn test_unlike_never_liked_post_is_noop() {
    let server = TestServer::spawn().await;
    let post_id = author_post(&server).await;
    let fan = TestClient::as_user(server.base_url.clone(), server.accounts.bystander);

    let response = fan.unlike_post(post_id).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"removed": false}));
}

#[tokio::test]
async fn test_like_missing_post_is_not_found() {
    let server = TestServer::spawn().await;
    let fan = TestClient::as_user(server.base_url.clone(), server.accounts.bystander);

    let response = fan.like_post(424242).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_like_with_non_numeric_id_is_bad_request() {
    let server = TestServer::spawn().await;
    let fan = TestClient::as_user(server.base_url.clone(), server.accounts.bystander);

    let response = fan.raw(reqwest::Method::POST, "/v1/posts/p1/like").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
