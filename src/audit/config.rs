//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Seven years, the longest common regulatory floor for audit evidence.
const SEVEN_YEARS_DAYS: u32 = 2555;

/// Audit engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Retention applied when a draft does not specify one, in days.
    pub default_retention_days: u32,
    /// Regulatory floor. Drafts below it are clamped up, never rejected.
    pub min_retention_days: u32,
    /// Overall budget for a synchronous write: lock acquisition + persist.
    pub sync_timeout_ms: u64,
    /// Bound on queued async jobs.
    pub queue_capacity: usize,
    /// Retry behavior for the async worker.
    pub retry: RetryPolicy,
}

impl AuditConfig {
    /// Synchronous write budget as a `Duration`.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    /// Set the synchronous write budget.
    pub fn with_sync_timeout_ms(mut self, ms: u64) -> Self {
        self.sync_timeout_ms = ms;
        self
    }

    /// Set retention defaults.
    pub fn with_retention_days(mut self, default_days: u32, min_days: u32) -> Self {
        self.default_retention_days = default_days;
        self.min_retention_days = min_days;
        self
    }

    /// Set the async queue bound.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_retention_days: SEVEN_YEARS_DAYS,
            min_retention_days: SEVEN_YEARS_DAYS,
            sync_timeout_ms: 5_000,
            queue_capacity: 1_024,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded exponential backoff for async job retries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts before a job is dead-lettered.
    pub max_attempts: u32,
    /// Delay after the first failure, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Backoff delay after the given attempt (1-based), doubling per
    /// attempt up to the cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 50,
            max_delay_ms: 5_000,
        }
    }
}
