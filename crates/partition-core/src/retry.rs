//! Retry decisions for chunk dispatch
//!
//! Pure functions: the coordinator owns the loop and the sleeping.

use std::time::Duration;

use crate::job::{ChunkFailure, FailureKind};

/// Upper bound on a single backoff, whatever the attempt number
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Whether a failed attempt should be retried
///
/// `attempt` is the number of attempts already made (1 after the first
/// call). Only server-side errors are retried, and only while attempts
/// remain. Client errors are terminal no matter how many attempts are left.
pub fn should_retry(status: u16, attempt: u32, max_attempts: u32) -> bool {
    (500..=599).contains(&status) && attempt < max_attempts
}

/// Delay before the attempt following `attempt`: `base * 2^(attempt - 1)`
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(MAX_BACKOFF)
}

/// Retry settings carried from configuration into the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Delay before retrying, or `None` when the failure is terminal
    pub fn next_delay(&self, failure: &ChunkFailure, attempt: u32) -> Option<Duration> {
        if failure.kind() != FailureKind::TransientWorkerError {
            return None;
        }
        should_retry(failure.status, attempt, self.max_attempts)
            .then(|| backoff_delay(attempt, self.backoff_base))
    }
}
