//! RPS Gate
//!
//! A single shared cursor over call starts. Every worker funnels through one
//! async mutex, so the aggregate start rate of the pool is capped, not the
//! per-worker rate.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

pub struct RpsGate {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RpsGate {
    /// Gate admitting one start per `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until at least `interval` has passed since the previous admitted
    /// start, then record this start.
    ///
    /// The cursor lock is held across the wait so that waiters are admitted
    /// one at a time, each spaced from its predecessor.
    pub async fn acquire_start_slot(&self) {
        let mut last = self.last_start.lock().await;
        if let Some(previous) = *last {
            let next = previous + self.interval;
            let now = Instant::now();
            if next > now {
                debug!("RPS gate: waiting {:?} for start slot", next - now);
                sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_start_is_immediate() {
        let gate = RpsGate::new(Duration::from_millis(500));
        let before = Instant::now();
        gate.acquire_start_slot().await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_starts_are_spaced() {
        let gate = Arc::new(RpsGate::new(Duration::from_millis(500)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    gate.acquire_start_slot().await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_gap_needs_no_wait() {
        let gate = RpsGate::new(Duration::from_millis(500));
        gate.acquire_start_slot().await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let before = Instant::now();
        gate.acquire_start_slot().await;
        assert_eq!(Instant::now(), before);
    }
}
