//! Docscribe - Vision-Model Document Transcription
//!
//! Turns a directory of scanned document images into one schema-conformant
//! JSON transcript per page, calling a rate-limited remote vision model.
//!
//! ## Core Features
//!
//! - **Shared Rate Limiter**: RPS spacing, in-flight cap, and a sliding
//!   token-per-minute window, shared by every worker
//! - **Backoff Retrier**: exponential backoff with jitter for rate limits only
//! - **Validate and Repair**: normalization, schema checks, and one
//!   corrective turn when the model's reply does not conform
//! - **Resumable Batches**: existing artifacts are skipped on re-run
//!
//! ## Quick Start
//!
//! ```ignore
//! use docscribe::{BatchRunner, ConfigLoader, InputScanner};
//!
//! let config = ConfigLoader::load()?;
//! let inputs = InputScanner::new(&config.batch.input_dir).scan()?;
//! let report = runner.run(inputs, &config.batch.output_dir, 4, true).await;
//! println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: provider abstraction, rate limiting, retries, validation
//! - [`batch`]: input scanning and the worker-pool driver
//! - [`config`]: layered configuration
//! - [`types`]: transcript schema and errors

pub mod ai;
pub mod batch;
pub mod cli;
pub mod config;
pub mod constants;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{ErrorCategory, Result, ScribeError};
pub use types::{Transcript, TranscriptMetadata};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use ai::{
    BackoffRetrier, MetricsCollector, RateLimiter, SharedMetrics, SharedProvider,
    TranscriptValidator, VisionProvider, with_timeout,
};
pub use batch::{BatchReport, BatchRunner, InputScanner, JobOutcome, JobStatus};
