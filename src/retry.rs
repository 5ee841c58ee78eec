//! Bounded exponential backoff around a single request attempt.
//!
//! An action is re-run until it succeeds or the policy's attempt budget is
//! spent. After the failed attempt with zero-based index `i` the retrier waits
//! `base_delay * 2^i` before trying again: no jitter, no cap. With every
//! attempt failing, the total time spent waiting is therefore
//! `base_delay * (2^0 + 2^1 + ... + 2^(max_attempts - 2))`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Immutable retry configuration for one call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Base unit used by the plot screen when nothing is configured
    pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

    /// Create a policy. `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// One attempt, never waits
    pub fn single_attempt() -> Self {
        Self::new(1, 0)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay_ms)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait time after the failed attempt with the given zero-based index
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Total wait time when every attempt fails
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts - 1)
            .map(|i| self.delay_for(i))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Self::DEFAULT_BASE_DELAY_MS)
    }
}

/// Run `action` until it succeeds or the attempt budget is exhausted.
///
/// Every failure is treated as transient. The last error is returned to the
/// caller once `max_attempts` attempts have failed.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, action: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_when(policy, action, |_| true).await
}

/// Like [`retry`], but stops early when `should_retry` rejects an error.
pub async fn retry_when<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut action: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt_index: u32 = 0;

    loop {
        let err = match action().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let attempts_made = attempt_index + 1;
        if attempts_made >= policy.max_attempts || !should_retry(&err) {
            return Err(err);
        }

        let delay = policy.delay_for(attempt_index);
        tracing::warn!(
            attempt = attempts_made,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Attempt failed: {}; retrying",
            err
        );
        tokio::time::sleep(delay).await;
        attempt_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "expected ~{:?}, got {:?}",
            expected,
            elapsed
        );
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(5, 1000);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_total_backoff() {
        assert_eq!(RetryPolicy::new(1, 1000).total_backoff(), Duration::ZERO);
        assert_eq!(RetryPolicy::new(2, 1000).total_backoff(), Duration::from_secs(1));
        assert_eq!(RetryPolicy::new(4, 1000).total_backoff(), Duration::from_secs(7));
        assert_eq!(RetryPolicy::new(3, 250).total_backoff(), Duration::from_millis(750));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let policy = RetryPolicy::new(0, 1000);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.total_backoff(), Duration::ZERO);
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 200,
            apply_to_todos: false,
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.base_delay(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_uses_every_attempt() {
        for n in 2..=5u32 {
            let policy = RetryPolicy::new(n, 1000);
            let calls = Arc::new(AtomicU32::new(0));
            let start = Instant::now();

            let counter = calls.clone();
            let result: Result<(), String> = retry(policy, || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("connection refused".to_string())
                }
            })
            .await;

            assert_eq!(result.unwrap_err(), "connection refused");
            assert_eq!(calls.load(Ordering::SeqCst), n);
            assert_elapsed(start, policy.total_backoff());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_waits() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), &str> = retry(RetryPolicy::new(1, 1000), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("boom") }
        })
        .await;

        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_returns_immediately() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<u32, &str> = retry(RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<&str, &str> = retry(RetryPolicy::new(5, 1000), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err("unavailable") } else { Ok("done") } }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Waited after attempts 0 and 1: 1s + 2s
        assert_elapsed(start, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_when_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), &str> = retry_when(
            RetryPolicy::new(4, 1000),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("bad request") }
            },
            |e| *e != "bad request",
        )
        .await;

        assert_eq!(result, Err("bad request"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
