//! Batch Metrics Collection
//!
//! Counters for inference traffic across all workers of one batch run:
//! calls issued, rate-limit retries, repair rounds and token usage.
//! Thread-safe for concurrent workers.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = create_shared_metrics("batch");
//! metrics.record_response(&response);
//! println!("{}", metrics.summary().display());
//! ```

use crate::ai::provider::{LlmResponse, TokenUsage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe metrics collector for a batch run.
///
/// Uses atomic operations only; workers never contend on a lock.
pub struct MetricsCollector {
    /// Run identifier
    session_id: String,
    start_time: Instant,
    /// Inference calls that returned a response
    api_calls: AtomicU32,
    /// Attempts that ended in a rate-limit signal and were retried
    rate_limit_retries: AtomicU32,
    /// Corrective turns issued after schema violations
    repair_rounds: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Summary statistics for a batch run
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub session_id: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub rate_limit_retries: u32,
    pub repair_rounds: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
}

impl MetricsCollector {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            rate_limit_retries: AtomicU32::new(0),
            repair_rounds: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    /// Record metrics from a successful inference response
    pub fn record_response(&self, response: &LlmResponse) {
        self.record_tokens(&response.usage, response.timing.total_ms);
    }

    /// Record token usage directly
    pub fn record_tokens(&self, usage: &TokenUsage, latency_ms: u64) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_rate_limit_retry(&self) {
        self.rate_limit_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_repair_round(&self) {
        self.repair_rounds.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency = if api_calls > 0 {
            total_latency as f64 / api_calls as f64
        } else {
            0.0
        };

        MetricsSummary {
            session_id: self.session_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            rate_limit_retries: self.rate_limit_retries.load(Ordering::Relaxed),
            repair_rounds: self.repair_rounds.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms: avg_latency,
        }
    }

    /// Get final summary
    pub fn summary(&self) -> MetricsSummary {
        self.snapshot()
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Session: {}\n\
             Duration: {:.1}s\n\
             API Calls: {}\n\
             Rate-limit Retries: {}\n\
             Repair Rounds: {}\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms",
            self.session_id,
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.rate_limit_retries,
            self.repair_rounds,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
        )
    }
}

// =============================================================================
// Shared Type
// =============================================================================

/// Shared metrics collector for all workers
pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics(session_id: impl Into<String>) -> SharedMetrics {
    Arc::new(MetricsCollector::new(session_id))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(input: u32, output: u32) -> TokenUsage {
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
        }
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = Arc::new(MetricsCollector::new("concurrent-test"));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_tokens(&usage(10, 5), 50);
                        m.record_rate_limit_retry();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1000);
        assert_eq!(summary.rate_limit_retries, 1000);
        assert_eq!(summary.input_tokens, 10000);
        assert_eq!(summary.output_tokens, 5000);
        assert!((summary.avg_latency_ms - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_display() {
        let metrics = MetricsCollector::new("display-test");
        metrics.record_tokens(&usage(1000, 500), 1000);
        metrics.record_repair_round();

        let display = metrics.summary().display();
        assert!(display.contains("display-test"));
        assert!(display.contains("1500"));
        assert!(display.contains("Repair Rounds: 1"));
    }
}
