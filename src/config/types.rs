//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Quota constants live here as process-wide settings, not per-call parameters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{batch, limits, network, retry, validation};
use crate::types::{Result, ScribeError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Inference provider settings
    pub llm: LlmConfig,

    /// Client-side quota approximations
    pub limits: LimitsConfig,

    /// Backoff retrier settings
    pub retry: RetryConfig,

    /// Schema repair settings
    pub validation: ValidationConfig,

    /// Batch driver settings
    pub batch: BatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            limits: LimitsConfig::default(),
            retry: RetryConfig::default(),
            validation: ValidationConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ScribeError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ScribeError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ScribeError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !(self.limits.max_rps.is_finite() && self.limits.max_rps > 0.0) {
            return Err(ScribeError::Config(format!(
                "limits.max_rps must be a positive number, got {}",
                self.limits.max_rps
            )));
        }

        if self.limits.max_concurrent == 0 {
            return Err(ScribeError::Config(
                "limits.max_concurrent must be greater than 0".to_string(),
            ));
        }

        if self.limits.estimated_tokens_per_call >= self.limits.max_tokens_per_minute {
            return Err(ScribeError::Config(format!(
                "limits.estimated_tokens_per_call ({}) must be below limits.max_tokens_per_minute ({})",
                self.limits.estimated_tokens_per_call, self.limits.max_tokens_per_minute
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(ScribeError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.batch.workers == 0 {
            return Err(ScribeError::Config(
                "batch.workers must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Inference endpoint settings
///
/// The API key is never serialized and is redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type: "openai" (any OpenAI-compatible chat completions endpoint)
    pub provider: String,
    /// Vision-capable model name
    pub model: String,
    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,
    /// API key; falls back to `OPENAI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Ceiling on a single inference call (seconds)
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Replace the built-in transcription prompt with this file's contents
    pub prompt_file: Option<PathBuf>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("prompt_file", &self.prompt_file)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_base: None,
            api_key: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            max_tokens: 8192,
            prompt_file: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Quota Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Admitted call starts per second (aggregate over all workers)
    pub max_rps: f64,
    /// Simultaneously in-flight calls
    pub max_concurrent: usize,
    /// Estimated tokens admitted per trailing 60 seconds
    pub max_tokens_per_minute: u64,
    /// Cost charged against the window for each call attempt
    pub estimated_tokens_per_call: u64,
    /// Longest single wait before the token window is re-checked (ms)
    pub token_poll_interval_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rps: limits::MAX_RPS,
            max_concurrent: limits::MAX_CONCURRENT,
            max_tokens_per_minute: limits::MAX_TOKENS_PER_MINUTE,
            estimated_tokens_per_call: limits::ESTIMATED_TOKENS_PER_CALL,
            token_poll_interval_ms: limits::TOKEN_POLL_INTERVAL_MS,
        }
    }
}

impl LimitsConfig {
    /// Minimum spacing between admitted call starts
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.max_rps)
    }

    pub fn token_window(&self) -> Duration {
        Duration::from_secs(limits::TOKEN_WINDOW_SECS)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.token_poll_interval_ms)
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per logical call (first try included)
    pub max_attempts: u32,
    /// Base delay for exponential backoff (ms)
    pub base_delay_ms: u64,
    /// Upper bound of the uniform jitter (ms)
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: retry::MAX_ATTEMPTS,
            base_delay_ms: retry::BASE_DELAY_MS,
            max_jitter_ms: retry::MAX_JITTER_MS,
        }
    }
}

// =============================================================================
// Validation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Corrective turns issued before a schema violation becomes fatal
    pub max_repair_rounds: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_repair_rounds: validation::MAX_REPAIR_ROUNDS,
        }
    }
}

// =============================================================================
// Batch Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory of scanned images
    pub input_dir: PathBuf,
    /// Directory receiving `<stem>.json` artifacts
    pub output_dir: PathBuf,
    /// Accepted image extensions (case-insensitive)
    pub extensions: Vec<String>,
    /// Worker pool size
    pub workers: usize,
    /// Maximum input files to process (0 = unbounded)
    pub max_files: usize,
    /// Skip inputs whose artifact already exists
    pub resume: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            extensions: batch::IMAGE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            workers: batch::DEFAULT_WORKERS,
            max_files: 0,
            resume: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.validation.max_repair_rounds, 1);
        assert_eq!(config.llm.timeout_secs, 120);
    }

    #[test]
    fn test_min_interval_from_rps() {
        let limits = LimitsConfig {
            max_rps: 4.0,
            ..Default::default()
        };
        assert_eq!(limits.min_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_zero_rps() {
        let mut config = Config::default();
        config.limits.max_rps = 0.0;
        assert!(matches!(config.validate(), Err(ScribeError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_call_estimate() {
        let mut config = Config::default();
        config.limits.estimated_tokens_per_call = config.limits.max_tokens_per_minute;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.batch.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_and_not_serialized() {
        let llm = LlmConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", llm).contains("sk-secret"));
        assert!(!serde_json::to_string(&llm).unwrap().contains("sk-secret"));
    }
}
