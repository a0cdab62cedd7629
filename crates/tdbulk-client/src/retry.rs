//! Exponential backoff bookkeeping
//!
//! The wait starts at `initial_interval`, doubles after every failed attempt and is capped
//! at `max_interval`. After `retry_limit` retries the *first* error seen is returned, since
//! later failures are usually a consequence of it (timeouts after a 503, and so on).

use crate::config;
use crate::error::ApiError;
use std::time::Duration;

/// Retry limits for one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub retry_limit: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_limit: config::DEFAULT_RETRY_LIMIT,
            initial_interval: Duration::from_millis(config::DEFAULT_RETRY_INITIAL_INTERVAL_MS),
            max_interval: Duration::from_millis(config::DEFAULT_RETRY_MAX_INTERVAL_MS),
        }
    }
}

/// What to do after a retryable failure
#[derive(Debug)]
pub enum RetryDecision {
    /// Sleep for the given duration, then try again
    Retry(Duration),
    /// Retries are exhausted; surface this (first) error
    GiveUp(ApiError),
}

/// Per-call retry state
#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    next_wait: Duration,
    first_error: Option<ApiError>,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            next_wait: policy.initial_interval.min(policy.max_interval),
            policy,
            attempt: 0,
            first_error: None,
        }
    }

    /// Failed attempts recorded so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record a retryable failure and decide whether to try again
    pub fn record_failure(&mut self, error: ApiError) -> RetryDecision {
        self.attempt += 1;

        let first = match self.first_error.take() {
            Some(first) => {
                tracing::debug!(
                    attempt = self.attempt,
                    error = %error,
                    "Dropping repeated failure"
                );
                first
            },
            None => error,
        };

        if self.attempt > self.policy.retry_limit {
            return RetryDecision::GiveUp(first);
        }

        self.first_error = Some(first);
        let wait = self.next_wait;
        self.next_wait = self
            .next_wait
            .saturating_mul(2)
            .min(self.policy.max_interval);
        RetryDecision::Retry(wait)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn server_error(body: &str) -> ApiError {
        ApiError::from_status("/v3/test", 503, body)
    }

    fn policy(limit: u32) -> RetryPolicy {
        RetryPolicy {
            retry_limit: limit,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(350),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut state = RetryState::new(policy(5));
        let mut waits = Vec::new();
        for i in 0..4 {
            match state.record_failure(server_error(&i.to_string())) {
                RetryDecision::Retry(wait) => waits.push(wait.as_millis()),
                RetryDecision::GiveUp(_) => panic!("gave up too early"),
            }
        }
        assert_eq!(waits, vec![100, 200, 350, 350]);
    }

    #[test]
    fn test_gives_up_with_first_error() {
        let mut state = RetryState::new(policy(2));
        assert!(matches!(state.record_failure(server_error("first")), RetryDecision::Retry(_)));
        assert!(matches!(state.record_failure(server_error("second")), RetryDecision::Retry(_)));

        match state.record_failure(server_error("third")) {
            RetryDecision::GiveUp(ApiError::Server { body, .. }) => assert_eq!(body, "first"),
            other => panic!("unexpected decision: {:?}", other),
        }
        assert_eq!(state.attempt(), 3);
    }

    #[test]
    fn test_zero_retry_limit_gives_up_immediately() {
        let mut state = RetryState::new(policy(0));
        assert!(matches!(state.record_failure(server_error("only")), RetryDecision::GiveUp(_)));
    }
}
