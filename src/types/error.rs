//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Retry Disposition
//!
//! Every failure is tagged either [`Disposition::Retryable`] or
//! [`Disposition::Terminal`]. Only a rate-limit signal from the inference
//! endpoint is retryable; schema violations, malformed responses, timeouts
//! and I/O failures are terminal for the backoff layer.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories reported by inference providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Request too large for the model context
    TokenLimit,
    /// Authentication failed
    Auth,
    /// Network/connectivity issues
    Network,
    /// Provider unavailable
    Unavailable,
    /// Invalid request
    BadRequest,
    /// Provider response envelope could not be decoded
    ParseError,
    /// Temporary server issues
    Transient,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Retry disposition of this category
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::RateLimit => Disposition::Retryable,
            _ => Disposition::Terminal,
        }
    }
}

/// Whether the backoff layer may retry a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retryable,
    Terminal,
}

// =============================================================================
// LLM Error
// =============================================================================

/// Provider error with category, context, and retry hints
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for retry decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Server-suggested wait (informational; backoff uses its own schedule)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Shorthand for the distinguished rate-limit signal
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::RateLimit, message)
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_rate_limit(&self) -> bool {
        self.category == ErrorCategory::RateLimit
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps provider failures onto categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status code returned by the inference endpoint
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            413 => LlmError::with_provider(ErrorCategory::TokenLimit, message, provider),
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify a transport-level failure (no HTTP status available)
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> LlmError {
        if err.is_timeout() || err.is_connect() {
            LlmError::with_provider(ErrorCategory::Network, err.to_string(), provider)
        } else if err.is_decode() {
            LlmError::with_provider(ErrorCategory::ParseError, err.to_string(), provider)
        } else {
            LlmError::with_provider(ErrorCategory::Unknown, err.to_string(), provider)
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single schema violation found in a model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// What validation failed
    pub kind: ValidationErrorKind,
    /// Dotted path of the offending field (e.g. `metadata.recipients`)
    pub field: Option<String>,
    /// Detailed message
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "'{}': {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::MissingField, "required key is missing").with_field(field)
    }

    pub fn wrong_type(field: impl Into<String>, expected: &str, actual: &str) -> Self {
        Self::new(
            ValidationErrorKind::Type,
            format!("expected {}, got {}", expected, actual),
        )
        .with_field(field)
    }
}

/// Validation error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required field missing
    MissingField,
    /// Field present with the wrong JSON type
    Type,
    /// Object does not match the transcript shape
    Schema,
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// Structured provider error with category
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Model output that could not be parsed as JSON
    #[error("Malformed response: {message} (preview: {preview})")]
    MalformedResponse { message: String, preview: String },

    /// Model output still violating the schema after the allowed repair rounds
    #[error("Schema violation: {}", join_violations(.0))]
    SchemaViolation(Vec<ValidationError>),

    /// A single reservation larger than the whole per-minute budget
    #[error("Token reservation of {requested} can never fit a per-minute budget of {budget}")]
    TokenBudget { requested: u64, budget: u64 },

    /// Two inputs of one batch map to the same artifact path
    #[error("Output {} is already claimed by {}", .output.display(), .first.display())]
    OutputCollision { output: PathBuf, first: PathBuf },

    /// A shared limiter primitive was shut down
    #[error("Rate limiter error: {0}")]
    Limiter(String),

    /// Worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Join(String),
}

fn join_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<LlmError> for ScribeError {
    fn from(err: LlmError) -> Self {
        ScribeError::Llm(err)
    }
}

impl From<tokio::task::JoinError> for ScribeError {
    fn from(err: tokio::task::JoinError) -> Self {
        ScribeError::Join(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;

impl ScribeError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Retry disposition used by the backoff layer
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Llm(e) => e.category.disposition(),
            _ => Disposition::Terminal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.disposition() == Disposition::Retryable
    }

    /// Short label used in job outcome records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
            Self::Llm(e) if e.is_rate_limit() => "rate_limit",
            Self::Llm(_) => "llm",
            Self::Timeout { .. } => "timeout",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::SchemaViolation(_) => "schema_violation",
            Self::TokenBudget { .. } => "token_budget",
            Self::OutputCollision { .. } => "output_collision",
            Self::Limiter(_) => "limiter",
            Self::Join(_) => "worker",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
