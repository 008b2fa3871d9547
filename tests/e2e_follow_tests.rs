//! End-to-end tests for follows and account creation

mod common;

use common::{TestClient, TestServer};
use reqwest::StatusCode;
use serde_json::Value;
use sia_social_server::social_store::SocialStore;

#[tokio::test]
async fn test_follow_notifies_followed_user() {
    let server = TestServer::spawn().await;
    let accounts = server.accounts;
    let fan = TestClient::as_user(server.base_url.clone(), accounts.bystander);

    let response = fan.follow_user(accounts.author).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["newly_followed"], true);
    assert_eq!(body["account"]["id"], accounts.author);

    let notifications = fan.wait_for_notifications(accounts.author, 1).await;
    assert_eq!(notifications[0]["notification_type"], "follow");
    assert_eq!(notifications[0]["triggering_user_id"], accounts.bystander);
    assert_eq!(
        notifications[0]["entity_id"],
        accounts.bystander.to_string()
    );
}

#[tokio::test]
async fn test_repeated_follow_notifies_once() {
    let server = TestServer::spawn().await;
    let accounts = server.accounts;
    let fan = TestClient::as_user(server.base_url.clone(), accounts.bystander);

    fan.follow_user(accounts.author).await;
    let response = fan.follow_user(accounts.author).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["newly_followed"], false);

    let notifications = fan
        .notifications_after_quiet_period(accounts.author)
        .await;
    assert_eq!(notifications.len(), 1);
}

#[tokio::test]
async fn test_self_follow_is_rejected() {
    let server = TestServer::spawn().await;
    let accounts = server.accounts;
    let narcissus = TestClient::as_user(server.base_url.clone(), accounts.bystander);

    let response = narcissus.follow_user(accounts.bystander).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_OPERATION");
    assert!(!server
        .store
        .is_following(accounts.bystander, accounts.bystander)
        .unwrap());
    assert!(narcissus
        .notifications_after_quiet_period(accounts.bystander)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_follow_unknown_account_is_not_found() {
    let server = TestServer::spawn().await;
    let fan = TestClient::as_user(server.base_url.clone(), server.accounts.bystander);

    let response = fan.follow_user(9999).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unfollow_stops_future_fan_out() {
    let server = TestServer::spawn().await;
    let accounts = server.accounts;
    let [leaving, staying] = accounts.followers;
    let leaver = TestClient::as_user(server.base_url.clone(), leaving);

    let response = leaver.unfollow_user(accounts.author).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["removed"], true);

    let response = leaver.unfollow_user(accounts.author).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["removed"], false);

    let author = TestClient::as_user(server.base_url.clone(), accounts.author);
    author.create_post("after unfollow", "").await;

    author.wait_for_notifications(staying, 1).await;
    assert!(author
        .notifications_after_quiet_period(leaving)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_create_account_then_follow() {
    let server = TestServer::spawn().await;
    let anonymous = TestClient::new(server.base_url.clone());

    let response = anonymous.create_account("newcomer").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let account: Value = response.json().await.unwrap();
    let newcomer = account["id"].as_i64().unwrap();

    let response = anonymous.create_account("newcomer").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let client = TestClient::as_user(server.base_url.clone(), newcomer);
    let response = client.follow_user(server.accounts.author).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(server
        .store
        .is_following(newcomer, server.accounts.author)
        .unwrap());
}

#[tokio::test]
async fn test_trigger_routes_need_actor() {
    let server = TestServer::spawn().await;
    let anonymous = TestClient::new(server.base_url.clone());

    let response = anonymous.follow_user(server.accounts.author).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = anonymous.unlike_post(1).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
