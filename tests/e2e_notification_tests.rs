//! End-to-end tests for the notification API
//!
//! Runs against the notification-only server, as deployed standalone.

mod common;

use common::{TestClient, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};
use sia_social_server::notifications::{NewNotification, NotificationStore, NotificationType};

async fn create(client: &TestClient, body: Value) -> Value {
    let response = client.create_notification(body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_create_assigns_server_fields() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());

    let created = create(
        &client,
        json!({
            "id": 999,
            "recipient_user_id": 10,
            "triggering_user_id": 11,
            "notification_type": "comment",
            "entity_id": "42",
            "content": "nice post",
            "resource_url": "/posts/42",
            "is_read": true,
            "created_at": 1,
        }),
    )
    .await;

    assert_ne!(created["id"], 999);
    assert_eq!(created["is_read"], false);
    assert_ne!(created["created_at"], 1);
    assert_eq!(created["created_at"], created["updated_at"]);
    assert_eq!(created["content"], "nice post");
    assert_eq!(created["resource_url"], "/posts/42");
}

#[tokio::test]
async fn test_create_accepts_legacy_field_names() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());

    let created = create(
        &client,
        json!({
            "user_id": 20,
            "sender_id": 21,
            "type": "new_follower",
            "resource_id": "21",
        }),
    )
    .await;

    assert_eq!(created["recipient_user_id"], 20);
    assert_eq!(created["triggering_user_id"], 21);
    assert_eq!(created["notification_type"], "follow");
    assert_eq!(created["entity_id"], "21");
    assert!(created.get("user_id").is_none());
}

#[tokio::test]
async fn test_create_rejects_malformed_and_self_notifications() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .create_notification(json!({"notification_type": "like"}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .create_notification(json!({
            "recipient_user_id": 5,
            "notification_type": "not-a-type",
        }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .create_notification(json!({
            "recipient_user_id": 5,
            "triggering_user_id": 5,
            "notification_type": "like",
        }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_OPERATION");
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());
    for (content, at) in [("old", 100), ("newest", 300), ("middle", 200)] {
        server
            .store
            .create_notification_at(
                &NewNotification::new(7, NotificationType::System).with_content(content),
                at,
            )
            .unwrap();
    }

    let list = client.notifications_of(7).await;

    let contents: Vec<&str> = list.iter().map(|n| n["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["newest", "middle", "old"]);
}

#[tokio::test]
async fn test_empty_list_for_unknown_user() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());

    assert!(client.notifications_of(12345).await.is_empty());
}

#[tokio::test]
async fn test_mark_read_and_unread_count() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());
    let first = create(&client, json!({"recipient_user_id": 3, "notification_type": "system"})).await;
    create(&client, json!({"recipient_user_id": 3, "notification_type": "system"})).await;

    let response = client
        .mark_notification_read(first["id"].as_i64().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get_unread_count(3).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"unread": 1}));

    // unknown ids are not an error
    let response = client.mark_notification_read(987654).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_mark_all_read_only_affects_that_user() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());
    for recipient in [1, 1, 2] {
        create(
            &client,
            json!({"recipient_user_id": recipient, "notification_type": "mention"}),
        )
        .await;
    }

    let response = client.mark_all_notifications_read(1).await;
    assert_eq!(response.status(), StatusCode::OK);

    let user_one = client.notifications_of(1).await;
    assert!(user_one.iter().all(|n| n["is_read"] == true));
    let user_two = client.notifications_of(2).await;
    assert!(user_two.iter().all(|n| n["is_read"] == false));
    assert_eq!(server.store.get_unread_count(2).unwrap(), 1);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());
    let created = create(&client, json!({"recipient_user_id": 4, "notification_type": "message"})).await;
    let id = created["id"].as_i64().unwrap();

    assert_eq!(client.delete_notification(id).await.status(), StatusCode::OK);
    assert_eq!(client.delete_notification(id).await.status(), StatusCode::OK);
    assert!(client.notifications_of(4).await.is_empty());
}

#[tokio::test]
async fn test_non_numeric_ids_are_bad_requests() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::new(server.base_url.clone());

    let cases = [
        (reqwest::Method::GET, "/notifications/user/abc"),
        (reqwest::Method::GET, "/notifications/user/abc/unread-count"),
        (reqwest::Method::PUT, "/notifications/abc/read"),
        (reqwest::Method::PUT, "/notifications/user/abc/read-all"),
        (reqwest::Method::DELETE, "/notifications/abc"),
    ];

    for (method, path) in cases {
        let response = client.raw(method, path).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", path);
    }
}

#[tokio::test]
async fn test_trigger_routes_are_not_served() {
    let server = TestServer::spawn_notification_only().await;
    let client = TestClient::as_user(server.base_url.clone(), server.accounts.author);

    let response = client.create_post("nope", "").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
