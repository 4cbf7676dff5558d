//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Provider quota approximations (client side)
pub mod limits {
    /// Maximum admitted call starts per second across all workers
    pub const MAX_RPS: f64 = 2.0;

    /// Maximum simultaneously in-flight inference calls
    pub const MAX_CONCURRENT: usize = 4;

    /// Token budget for any trailing 60-second window
    pub const MAX_TOKENS_PER_MINUTE: u64 = 1_000_000;

    /// Estimated cost charged per call (true cost is unknown before the response)
    pub const ESTIMATED_TOKENS_PER_CALL: u64 = 6_000;

    /// Length of the token accounting window (seconds)
    pub const TOKEN_WINDOW_SECS: u64 = 60;

    /// Upper bound on a single token-window wait before re-checking (milliseconds)
    pub const TOKEN_POLL_INTERVAL_MS: u64 = 250;
}

/// Backoff retrier constants
pub mod retry {
    /// Total attempts per logical call (first try included)
    pub const MAX_ATTEMPTS: u32 = 6;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Upper bound of the uniform jitter added to each backoff (milliseconds)
    pub const MAX_JITTER_MS: u64 = 300;
}

/// Schema validation constants
pub mod validation {
    /// Corrective follow-up turns allowed per job
    pub const MAX_REPAIR_ROUNDS: u32 = 1;

    /// Characters of a malformed response kept for error messages
    pub const PREVIEW_CHARS: usize = 200;
}

/// Batch driver constants
pub mod batch {
    /// Default worker pool size
    pub const DEFAULT_WORKERS: usize = 4;

    /// Image extensions accepted as inputs
    pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

    /// Extension of produced transcript artifacts
    pub const ARTIFACT_EXTENSION: &str = "json";
}

/// HTTP/Network constants
pub mod network {
    /// Default inference request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
