//! Shared Rate Limiter
//!
//! One [`RateLimiter`] owns the three gates every inference attempt passes:
//!
//! ```text
//! RPS gate ──▶ token window ──▶ concurrency gate ──▶ call
//! ```
//!
//! It is built once per run and handed to every worker behind an `Arc`.
//! No gate lock is held across the network call itself; only the
//! concurrency permit lives for the call's duration.

mod concurrency;
mod rps;
mod tokens;

pub use concurrency::{ConcurrencyGate, ConcurrencyPermit};
pub use rps::RpsGate;
pub use tokens::TokenWindow;

use std::sync::Arc;
use tracing::debug;

use crate::config::LimitsConfig;
use crate::types::Result;

pub struct RateLimiter {
    rps: RpsGate,
    tokens: TokenWindow,
    concurrency: ConcurrencyGate,
    estimated_tokens_per_call: u64,
}

pub type SharedRateLimiter = Arc<RateLimiter>;

impl RateLimiter {
    pub fn new(config: &LimitsConfig) -> Self {
        let limiter = Self {
            rps: RpsGate::new(config.min_interval()),
            tokens: TokenWindow::new(
                config.max_tokens_per_minute,
                config.token_window(),
                config.poll_interval(),
            ),
            concurrency: ConcurrencyGate::new(config.max_concurrent),
            estimated_tokens_per_call: config.estimated_tokens_per_call,
        };
        debug!(
            start_interval_ms = limiter.rps.interval().as_millis() as u64,
            token_budget = limiter.tokens.budget(),
            max_concurrent = limiter.concurrency.capacity(),
            "Rate limiter ready"
        );
        limiter
    }

    pub fn shared(config: &LimitsConfig) -> SharedRateLimiter {
        Arc::new(Self::new(config))
    }

    pub async fn acquire_start_slot(&self) {
        self.rps.acquire_start_slot().await;
    }

    /// Charge the configured per-call estimate against the token window
    pub async fn reserve_tokens(&self) -> Result<()> {
        self.tokens.reserve(self.estimated_tokens_per_call).await
    }

    pub async fn enter(&self) -> Result<ConcurrencyPermit> {
        self.concurrency.enter().await
    }

    /// Pass all three gates in order, returning the slot to hold for the call
    pub async fn admit(&self) -> Result<ConcurrencyPermit> {
        self.acquire_start_slot().await;
        self.reserve_tokens().await?;
        self.enter().await
    }

    pub fn in_flight(&self) -> usize {
        self.concurrency.in_flight()
    }

    pub fn tokens_spent(&self) -> u64 {
        self.tokens.spent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn limits() -> LimitsConfig {
        LimitsConfig {
            max_rps: 10.0,
            max_concurrent: 2,
            max_tokens_per_minute: 1_000,
            estimated_tokens_per_call: 100,
            token_poll_interval_ms: 250,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_caps_in_flight_and_token_spend() {
        let limiter = RateLimiter::shared(&limits());
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let permit = limiter.admit().await.unwrap();
                    let started = Instant::now();
                    peak.fetch_max(limiter.in_flight(), Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    drop(permit);
                    started
                })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        assert!(peak.load(Ordering::SeqCst) <= 2);
        // 9 reservations of 100 fit strictly under 1_000; the rest wait a window
        assert!(starts[11] - starts[0] >= Duration::from_secs(60));
        assert_eq!(limiter.in_flight(), 0);
    }
}
