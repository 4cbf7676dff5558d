//! AI Integration Layer
//!
//! The inference pipeline for one page: shared rate limiter, backoff
//! retrier, vision provider, and the validate-and-repair loop.

pub mod limiter;
pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod timeout;
pub mod validation;

pub use limiter::{
    ConcurrencyGate, ConcurrencyPermit, RateLimiter, RpsGate, SharedRateLimiter, TokenWindow,
};
pub use metrics::{MetricsCollector, MetricsSummary, SharedMetrics, create_shared_metrics};
pub use prompt::{PromptBuilder, PromptSection, PromptTemplates, load_prompt};
pub use provider::{
    CompletionRequest, ImageInput, LlmResponse, OpenAiProvider, ResponseMetadata, ResponseTiming,
    Role, SharedProvider, TokenUsage, Turn, VisionProvider, create_provider,
};
pub use retry::{BackoffRetrier, RetryPolicy};
pub use timeout::with_timeout;
pub use validation::{TranscriptValidator, ValidationOutcome, extract_json, normalize, validate};
