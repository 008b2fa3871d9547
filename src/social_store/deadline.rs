//! Deadline-bounded execution of blocking store calls.

use std::time::Duration;
use tracing::warn;

use crate::error::SocialError;
use crate::server::metrics::record_store_timeout;

/// Upper bounds for store operations issued on behalf of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    pub single_row: Duration,
    pub list: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        StoreTimeouts {
            single_row: Duration::from_secs(5),
            list: Duration::from_secs(10),
        }
    }
}

/// Runs a blocking store operation on the blocking pool, failing with
/// [`SocialError::Timeout`] if it doesn't complete within `timeout`.
///
/// Expiry is terminal for the caller. The blocking call itself cannot be interrupted
/// and finishes in the background, its result discarded.
pub async fn run_bounded<T, F>(
    operation: &'static str,
    timeout: Duration,
    op: F,
) -> Result<T, SocialError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(op)).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(err))) => Err(SocialError::Store(err.context(operation))),
        Ok(Err(join_err)) => Err(SocialError::Store(anyhow::anyhow!(
            "{} task failed: {}",
            operation,
            join_err
        ))),
        Err(_) => {
            warn!("Store operation '{}' exceeded {:?}", operation, timeout);
            record_store_timeout(operation);
            Err(SocialError::Timeout { operation, timeout })
        }
    }
}
