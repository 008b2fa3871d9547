use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::FanOutError;

/// Execution context of a single fan-out run.
///
/// Independent from the request that caused the run: it carries its own deadline
/// and a cancellation token that is tripped on shutdown or when the worker gives up.
#[derive(Clone)]
pub struct FanOutContext {
    pub cancellation_token: CancellationToken,
    deadline: Instant,
}

impl FanOutContext {
    pub fn new(timeout: Duration, cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Fails once the run has been cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), FanOutError> {
        if self.is_cancelled() {
            return Err(FanOutError::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(FanOutError::DeadlineExceeded);
        }
        Ok(())
    }
}
