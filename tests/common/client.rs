//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for every server endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use sia_social_server::server::HEADER_USER_ID_KEY;
use std::time::Duration;

/// HTTP test client acting as a single user
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as the acting user on every request, if set
    pub user_id: Option<i64>,
}

impl TestClient {
    /// Creates a client without an acting user
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            user_id: None,
        }
    }

    /// Creates a client acting as `user_id`
    pub fn as_user(base_url: String, user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::new(base_url)
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.user_id {
            Some(user_id) => builder.header(HEADER_USER_ID_KEY, user_id.to_string()),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder, what: &str) -> Response {
        builder
            .send()
            .await
            .unwrap_or_else(|e| panic!("{} request failed: {}", what, e))
    }

    // ========================================================================
    // Trigger Endpoints
    // ========================================================================

    /// POST /v1/accounts
    pub async fn create_account(&self, handle: &str) -> Response {
        let builder = self
            .request(reqwest::Method::POST, "/v1/accounts")
            .json(&json!({ "handle": handle }));
        self.send(builder, "Create account").await
    }

    /// POST /v1/posts
    pub async fn create_post(&self, title: &str, content: &str) -> Response {
        let builder = self
            .request(reqwest::Method::POST, "/v1/posts")
            .json(&json!({ "title": title, "content": content }));
        self.send(builder, "Create post").await
    }

    /// POST /v1/posts/{id}/like
    pub async fn like_post(&self, post_id: i64) -> Response {
        let builder = self.request(reqwest::Method::POST, &format!("/v1/posts/{}/like", post_id));
        self.send(builder, "Like post").await
    }

    /// DELETE /v1/posts/{id}/like
    pub async fn unlike_post(&self, post_id: i64) -> Response {
        let builder = self.request(
            reqwest::Method::DELETE,
            &format!("/v1/posts/{}/like", post_id),
        );
        self.send(builder, "Unlike post").await
    }

    /// POST /v1/users/{id}/follow
    pub async fn follow_user(&self, user_id: i64) -> Response {
        let builder = self.request(
            reqwest::Method::POST,
            &format!("/v1/users/{}/follow", user_id),
        );
        self.send(builder, "Follow user").await
    }

    /// DELETE /v1/users/{id}/follow
    pub async fn unfollow_user(&self, user_id: i64) -> Response {
        let builder = self.request(
            reqwest::Method::DELETE,
            &format!("/v1/users/{}/follow", user_id),
        );
        self.send(builder, "Unfollow user").await
    }

    // ========================================================================
    // Notification Endpoints
    // ========================================================================

    /// POST /notifications
    pub async fn create_notification(&self, body: Value) -> Response {
        let builder = self
            .request(reqwest::Method::POST, "/notifications")
            .json(&body);
        self.send(builder, "Create notification").await
    }

    /// GET /notifications/user/{userID}
    pub async fn get_notifications(&self, user_id: i64) -> Response {
        let builder = self.request(
            reqwest::Method::GET,
            &format!("/notifications/user/{}", user_id),
        );
        self.send(builder, "Get notifications").await
    }

    /// GET /notifications/user/{userID}/unread-count
    pub async fn get_unread_count(&self, user_id: i64) -> Response {
        let builder = self.request(
            reqwest::Method::GET,
            &format!("/notifications/user/{}/unread-count", user_id),
        );
        self.send(builder, "Get unread count").await
    }

    /// PUT /notifications/{id}/read
    pub async fn mark_notification_read(&self, notification_id: i64) -> Response {
        let builder = self.request(
            reqwest::Method::PUT,
            &format!("/notifications/{}/read", notification_id),
        );
        self.send(builder, "Mark notification read").await
    }

    /// PUT /notifications/user/{userID}/read-all
    pub async fn mark_all_notifications_read(&self, user_id: i64) -> Response {
        let builder = self.request(
            reqwest::Method::PUT,
            &format!("/notifications/user/{}/read-all", user_id),
        );
        self.send(builder, "Mark all notifications read").await
    }

    /// DELETE /notifications/{id}
    pub async fn delete_notification(&self, notification_id: i64) -> Response {
        let builder = self.request(
            reqwest::Method::DELETE,
            &format!("/notifications/{}", notification_id),
        );
        self.send(builder, "Delete notification").await
    }

    /// Any path, for malformed-input tests
    pub async fn raw(&self, method: reqwest::Method, path: &str) -> Response {
        let builder = self.request(method, path);
        self.send(builder, path).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Fetches a user's notifications, asserting success
    pub async fn notifications_of(&self, user_id: i64) -> Vec<Value> {
        let response = self.get_notifications(user_id).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response
            .json::<Vec<Value>>()
            .await
            .expect("Notification list is not JSON")
    }

    /// Polls until `user_id` has at least `count` notifications, returning them
    pub async fn wait_for_notifications(&self, user_id: i64, count: usize) -> Vec<Value> {
        let start = std::time::Instant::now();
        loop {
            let notifications = self.notifications_of(user_id).await;
            if notifications.len() >= count {
                return notifications;
            }
            if start.elapsed() > Duration::from_millis(FANOUT_WAIT_TIMEOUT_MS) {
                panic!(
                    "User {} has {} notifications after {}ms, expected {}",
                    user_id,
                    notifications.len(),
                    FANOUT_WAIT_TIMEOUT_MS,
                    count
                );
            }
            tokio::time::sleep(Duration::from_millis(FANOUT_POLL_INTERVAL_MS)).await;
        }
    }

    /// Polls until `user_id` has no notifications
    pub async fn wait_for_no_notifications(&self, user_id: i64) {
        let start = std::time::Instant::now();
        loop {
            if self.notifications_of(user_id).await.is_empty() {
                return;
            }
            if start.elapsed() > Duration::from_millis(FANOUT_WAIT_TIMEOUT_MS) {
                panic!("Notifications of user {} were never removed", user_id);
            }
            tokio::time::sleep(Duration::from_millis(FANOUT_POLL_INTERVAL_MS)).await;
        }
    }

    /// Gives background work time to run, then returns the notifications
    pub async fn notifications_after_quiet_period(&self, user_id: i64) -> Vec<Value> {
        tokio::time::sleep(Duration::from_millis(FANOUT_QUIET_PERIOD_MS)).await;
        self.notifications_of(user_id).await
    }
}
