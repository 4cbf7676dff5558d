//! Token Budget Tracker
//!
//! Sliding-window accounting of estimated token cost. A reservation stays
//! charged for the full window after admission, whatever the call actually
//! consumed; entries leave only by age.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::types::{Result, ScribeError};

pub struct TokenWindow {
    budget: u64,
    window: Duration,
    poll_interval: Duration,
    entries: Mutex<VecDeque<(Instant, u64)>>,
}

impl TokenWindow {
    pub fn new(budget: u64, window: Duration, poll_interval: Duration) -> Self {
        Self {
            budget,
            window,
            poll_interval,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Block until `cost` fits strictly under the budget, then charge it.
    ///
    /// Fails with [`ScribeError::TokenBudget`] when `cost` alone could never
    /// fit, instead of waiting forever.
    pub async fn reserve(&self, cost: u64) -> Result<()> {
        if cost >= self.budget {
            return Err(ScribeError::TokenBudget {
                requested: cost,
                budget: self.budget,
            });
        }

        loop {
            let wait = match self.try_reserve(cost) {
                None => return Ok(()),
                Some(wait) => wait,
            };
            debug!("Token window full: waiting {:?} before re-check", wait);
            sleep(wait).await;
        }
    }

    /// Charge `cost` if it fits now; otherwise return how long to wait
    /// before checking again.
    fn try_reserve(&self, cost: u64) -> Option<Duration> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Token window lock poisoned, recovering");
            poisoned.into_inner()
        });
        let now = Instant::now();
        self.evict(&mut entries, now);

        let spent: u64 = entries.iter().map(|(_, c)| c).sum();
        if spent + cost < self.budget {
            entries.push_back((now, cost));
            return None;
        }

        let until_oldest_expires = entries
            .front()
            .map(|(at, _)| (*at + self.window).saturating_duration_since(now))
            .unwrap_or(self.poll_interval);
        Some(
            until_oldest_expires
                .min(self.poll_interval)
                .max(Duration::from_millis(1)),
        )
    }

    fn evict(&self, entries: &mut VecDeque<(Instant, u64)>, now: Instant) {
        while let Some((at, _)) = entries.front() {
            if *at + self.window <= now {
                entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Estimated tokens charged in the current window
    pub fn spent(&self) -> u64 {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Token window lock poisoned on read, recovering");
            poisoned.into_inner()
        });
        self.evict(&mut entries, Instant::now());
        entries.iter().map(|(_, c)| c).sum()
    }
}
