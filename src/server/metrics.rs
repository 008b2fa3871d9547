use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

use crate::notifications::NotificationType;

/// Metric name prefix for all service metrics
const PREFIX: &str = "sia_social";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Fan-out Metrics
    pub static ref FANOUT_RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(format!("{PREFIX}_fanout_runs_total"), "Completed fan-out runs by outcome"),
        &["kind", "outcome"]
    ).expect("Failed to create fanout_runs_total metric");

    pub static ref FANOUT_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_fanout_duration_seconds"),
            "Fan-out run duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]),
        &["kind"]
    ).expect("Failed to create fanout_duration_seconds metric");

    pub static ref FANOUT_REJECTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(format!("{PREFIX}_fanout_rejected_total"), "Fan-out tasks dropped before running"),
        &["kind", "reason"]
    ).expect("Failed to create fanout_rejected_total metric");

    // Notification Metrics
    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(format!("{PREFIX}_notifications_created_total"), "Notifications persisted"),
        &["type"]
    ).expect("Failed to create notifications_created_total metric");

    pub static ref NOTIFICATION_INSERT_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            format!("{PREFIX}_notification_insert_failures_total"),
            "Notification inserts that failed during fan-out"
        ),
        &["type"]
    ).expect("Failed to create notification_insert_failures_total metric");

    // Store Metrics
    pub static ref STORE_TIMEOUTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(format!("{PREFIX}_store_timeouts_total"), "Store operations that hit their deadline"),
        &["operation"]
    ).expect("Failed to create store_timeouts_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(FANOUT_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FANOUT_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(FANOUT_REJECTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATIONS_CREATED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATION_INSERT_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STORE_TIMEOUTS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses numeric path segments so ids don't become label values.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let path = normalize_path(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, &path])
        .observe(duration.as_secs_f64());
}

pub fn record_fanout_run(kind: &str, outcome: &str) {
    FANOUT_RUNS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn record_fanout_duration(kind: &str, duration: Duration) {
    FANOUT_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

/// Record a task dropped at submission ("queue_full" or "closed")
pub fn record_fanout_rejected(kind: &str, reason: &str) {
    FANOUT_REJECTED_TOTAL.with_label_values(&[kind, reason]).inc();
}

pub fn record_notification_created(notification_type: NotificationType) {
    NOTIFICATIONS_CREATED_TOTAL
        .with_label_values(&[notification_type.as_str()])
        .inc();
}

pub fn record_notification_insert_failure(notification_type: NotificationType) {
    NOTIFICATION_INSERT_FAILURES_TOTAL
        .with_label_values(&[notification_type.as_str()])
        .inc();
}

pub fn record_store_timeout(operation: &str) {
    STORE_TIMEOUTS_TOTAL.with_label_values(&[operation]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
