//! Shared constants for end-to-end tests
//!
//! When test data changes (account handles, timeouts, etc.), update only this file.

// ============================================================================
// Test Accounts
// ============================================================================

/// Handle of the account whose posts fan out in most tests
pub const AUTHOR_HANDLE: &str = "author";

/// Handles of the accounts following the author
pub const FOLLOWER_HANDLES: [&str; 2] = ["follower-a", "follower-b"];

/// Handle of an account with no relationship to the others
pub const BYSTANDER_HANDLE: &str = "bystander";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Maximum time to wait for background fan-out to land (milliseconds)
pub const FANOUT_WAIT_TIMEOUT_MS: u64 = 5000;

/// Polling interval while waiting for fan-out (milliseconds)
pub const FANOUT_POLL_INTERVAL_MS: u64 = 25;

/// How long to keep checking that something did *not* happen (milliseconds)
pub const FANOUT_QUIET_PERIOD_MS: u64 = 300;
