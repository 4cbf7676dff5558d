//! Backoff Retrier
//!
//! Wraps one logical inference call. Each attempt passes the shared
//! [`RateLimiter`](crate::ai::limiter::RateLimiter) gates, runs under the call
//! timeout, and holds its concurrency slot only while the call is in flight.
//!
//! Only [`Disposition::Retryable`](crate::types::Disposition) failures (the
//! endpoint's rate-limit signal) are retried, after
//! `base_delay * 2^(attempt-1)` plus uniform jitter. Everything else
//! propagates on the first occurrence.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::ai::limiter::SharedRateLimiter;
use crate::ai::metrics::SharedMetrics;
use crate::ai::timeout::with_timeout;
use crate::config::RetryConfig;
use crate::types::Result;

// =============================================================================
// Retry Policy
// =============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
        }
    }

    /// Deterministic part of the delay after failed attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Backoff plus uniform jitter in `0..=max_jitter`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff(attempt) + random_jitter(self.max_jitter)
    }
}

fn random_jitter(max_jitter: Duration) -> Duration {
    let max_ms = max_jitter.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

// =============================================================================
// Retrier
// =============================================================================

pub struct BackoffRetrier {
    limiter: SharedRateLimiter,
    policy: RetryPolicy,
    call_timeout: Duration,
    metrics: Option<SharedMetrics>,
}

impl BackoffRetrier {
    pub fn new(limiter: SharedRateLimiter, policy: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            limiter,
            policy,
            call_timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `op` is invoked once per attempt, after the RPS gate, the token
    /// reservation and the concurrency gate have all admitted it.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let result = {
                let _permit = self.limiter.admit().await?;
                debug!(
                    attempt,
                    in_flight = self.limiter.in_flight(),
                    tokens_spent = self.limiter.tokens_spent(),
                    "Inference attempt admitted"
                );
                with_timeout(self.call_timeout, op(), "inference call").await
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Rate limited, backing off"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_rate_limit_retry();
                    }
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(attempts = attempt, "Rate limit persisted, giving up");
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::limiter::RateLimiter;
    use crate::ai::metrics::create_shared_metrics;
    use crate::config::LimitsConfig;
    use crate::types::{ErrorCategory, LlmError, ScribeError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn retrier(max_attempts: u32) -> BackoffRetrier {
        let limits = LimitsConfig {
            max_rps: 1000.0,
            ..Default::default()
        };
        let policy = RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(300),
        };
        BackoffRetrier::new(RateLimiter::shared(&limits), policy, Duration::from_secs(120))
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|a| policy.backoff(a).as_millis()).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000]);
    }

    #[test]
    fn test_delay_stays_within_jitter_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..=5 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= policy.backoff(attempt));
            assert!(delay <= policy.backoff(attempt) + Duration::from_millis(300));
        }
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff(100) >= policy.backoff(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_makes_exactly_max_attempts() {
        let retrier = retrier(6);
        let calls = &AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = retrier
            .call(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::rate_limited("429").into())
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ScribeError::Llm(LlmError {
                category: ErrorCategory::RateLimit,
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        // 0.5 + 1 + 2 + 4 + 8 seconds before jitter
        assert!(Instant::now() - start >= Duration::from_millis(15_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_is_not_retried() {
        let retrier = retrier(6);
        let calls = &AtomicU32::new(0);

        let result: Result<()> = retrier
            .call(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::new(ErrorCategory::Auth, "bad key").into())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_rate_limits() {
        let metrics = create_shared_metrics("retry-test");
        let retrier = retrier(6).with_metrics(Arc::clone(&metrics));
        let calls = &AtomicU32::new(0);

        let value = retrier
            .call(|| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(LlmError::rate_limited("429").into())
                } else {
                    Ok("transcribed")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "transcribed");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(metrics.summary().rate_limit_retries, 2);
    }

    fn steady_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_retry_charges_the_token_window_again() {
        // Three reservations of 100 fit strictly under 350; a fourth must wait
        // for the first to age out of the minute window.
        let limits = LimitsConfig {
            max_rps: 1000.0,
            max_concurrent: 1,
            max_tokens_per_minute: 350,
            estimated_tokens_per_call: 100,
            token_poll_interval_ms: 250,
        };
        let limiter = RateLimiter::shared(&limits);
        let retrier = BackoffRetrier::new(
            Arc::clone(&limiter),
            steady_policy(4),
            Duration::from_secs(120),
        );
        let seen = &Mutex::new(Vec::new());
        let start = Instant::now();

        let result: Result<()> = {
            let limiter = &limiter;
            retrier
                .call(|| async move {
                    seen.lock()
                        .unwrap()
                        .push((Instant::now() - start, limiter.tokens_spent()));
                    Err(LlmError::rate_limited("429").into())
                })
                .await
        };

        assert!(result.is_err());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        let spent: Vec<u64> = seen.iter().take(3).map(|(_, s)| *s).collect();
        assert_eq!(spent, vec![100, 200, 300]);
        assert!(seen[3].0 >= Duration::from_secs(60));
        assert!(seen[3].1 < 350);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_is_free_during_backoff() {
        let limits = LimitsConfig {
            max_rps: 1000.0,
            max_concurrent: 1,
            ..Default::default()
        };
        let limiter = RateLimiter::shared(&limits);
        let retrier = BackoffRetrier::new(
            Arc::clone(&limiter),
            steady_policy(2),
            Duration::from_secs(120),
        );
        let calls = &AtomicU32::new(0);
        let in_call = &Mutex::new(Vec::new());

        let limiter_ref = &limiter;
        let attempt = {
            retrier.call(|| async move {
                in_call.lock().unwrap().push(limiter_ref.in_flight());
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(LlmError::rate_limited("429").into())
                } else {
                    Ok("transcribed")
                }
            })
        };
        // Lands inside the 500ms backoff after the first failure
        let during_backoff = async {
            sleep(Duration::from_millis(250)).await;
            let idle = limiter.in_flight();
            let permit = limiter.enter().await.unwrap();
            drop(permit);
            idle
        };

        let (value, idle) = tokio::join!(attempt, during_backoff);

        assert_eq!(value.unwrap(), "transcribed");
        assert_eq!(idle, 0);
        assert_eq!(*in_call.lock().unwrap(), vec![1, 1]);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_terminal() {
        let limits = LimitsConfig::default();
        let retrier = BackoffRetrier::new(
            RateLimiter::shared(&limits),
            RetryPolicy::default(),
            Duration::from_secs(1),
        );
        let calls = &AtomicU32::new(0);

        let result: Result<()> = retrier
            .call(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ScribeError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
