//! Asynchronous notification fan-out.
//!
//! Triggers submit a [`FanOutTask`] to a [`FanOutQueue`]. The [`FanOutWorkerPool`]
//! runs each task on the blocking pool through the [`FanOutEngine`], under a deadline
//! of its own. Failures are logged and counted and never reach the triggering request.
//! Partial delivery is an accepted terminal state: there is no retry and no
//! transaction around a run.

mod context;
mod engine;
mod pool;
mod sink;
mod task;

pub use context::FanOutContext;
pub use engine::{resolve_recipients, FanOutEngine};
pub use pool::{FanOutQueue, FanOutWorkerPool};
pub use sink::{BroadcastEventSink, EventSink, LogEventSink, NoopEventSink, SocialEvent};
pub use task::{FanOutReport, FanOutTask};

#[cfg(any(test, feature = "mock"))]
pub use pool::MockFanOutQueue;
#[cfg(any(test, feature = "mock"))]
pub use sink::MockEventSink;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FanOutError {
    #[error("Failed to resolve recipients: {0:#}")]
    RecipientQuery(anyhow::Error),

    #[error("Failed to look up post author: {0:#}")]
    AuthorLookup(anyhow::Error),

    #[error("Store error: {0:#}")]
    Store(anyhow::Error),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Cancelled")]
    Cancelled,
}

impl FanOutError {
    /// Label used for the run outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            FanOutError::RecipientQuery(_) | FanOutError::AuthorLookup(_) => "aborted",
            FanOutError::Store(_) => "store_error",
            FanOutError::DeadlineExceeded => "timeout",
            FanOutError::Cancelled => "cancelled",
        }
    }
}
