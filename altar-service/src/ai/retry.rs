//! Retry policy for AI requests.

use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    DontRetry,
}

/// Bounded retry with exponential backoff for rate limits and a flat delay
/// for other transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
        }
    }
}

impl RetryPolicy {
    /// Decide whether retry number `retry` (1-indexed) happens after a
    /// failure of class `kind`, and how long to wait before it.
    pub fn decide(&self, kind: FailureKind, retry: u32) -> RetryDecision {
        if !kind.is_retryable() || retry == 0 || retry > self.max_retries {
            return RetryDecision::DontRetry;
        }

        match kind {
            FailureKind::RateLimited => {
                let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
                RetryDecision::Retry(self.base_delay.saturating_mul(factor))
            }
            _ => RetryDecision::Retry(self.base_delay),
        }
    }
}
