//! Validate-and-repair loop
//!
//! Runs the rate-limited inference call, normalizes and validates the reply,
//! and on schema violations appends a corrective turn and asks again, up to
//! the configured number of repair rounds.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::extract::extract_json;
use super::schema::{ValidationOutcome, normalize, validate};
use crate::ai::metrics::SharedMetrics;
use crate::ai::prompt::PromptTemplates;
use crate::ai::provider::{CompletionRequest, SharedProvider};
use crate::ai::retry::BackoffRetrier;
use crate::types::{Result, ScribeError, Transcript};

pub struct TranscriptValidator {
    provider: SharedProvider,
    retrier: Arc<BackoffRetrier>,
    max_repair_rounds: u32,
    metrics: Option<SharedMetrics>,
}

impl TranscriptValidator {
    pub fn new(provider: SharedProvider, retrier: Arc<BackoffRetrier>, max_repair_rounds: u32) -> Self {
        Self {
            provider,
            retrier,
            max_repair_rounds,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Drive the conversation until the reply is a conformant transcript.
    ///
    /// Fails with the retrier's error, [`ScribeError::MalformedResponse`]
    /// for unparseable text, or [`ScribeError::SchemaViolation`] once the
    /// repair rounds are spent.
    #[instrument(skip_all, fields(provider = self.provider.name()))]
    pub async fn run(&self, mut request: CompletionRequest) -> Result<Transcript> {
        let mut round = 0;
        loop {
            let response = self
                .retrier
                .call(|| self.provider.complete(&request))
                .await?;
            if let Some(metrics) = &self.metrics {
                metrics.record_response(&response);
            }

            let mut value = extract_json(&response.text)?;
            normalize(&mut value);

            let violations = match validate(&value) {
                ValidationOutcome::Conformant(transcript) => {
                    if round > 0 {
                        debug!(round, "Response conformant after repair");
                    }
                    return Ok(transcript);
                }
                ValidationOutcome::Violations(violations) => violations,
            };

            if round >= self.max_repair_rounds {
                return Err(ScribeError::SchemaViolation(violations));
            }

            round += 1;
            warn!(
                round,
                violations = violations.len(),
                "Schema violations, issuing corrective turn"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_repair_round();
            }
            request.push_assistant(response.text);
            request.push_user(PromptTemplates::repair(&violations));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::limiter::RateLimiter;
    use crate::ai::metrics::create_shared_metrics;
    use crate::ai::provider::{ImageInput, LlmResponse, Role, VisionProvider};
    use crate::ai::retry::RetryPolicy;
    use crate::config::LimitsConfig;
    use crate::types::LlmError;
    use crate::types::transcript::fixtures::conformant_value;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted replies and records every conversation it receives
    struct ScriptedProvider {
        replies: Mutex<Vec<Result<String>>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            let mut replies = replies;
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VisionProvider for ScriptedProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
            self.seen.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .expect("script exhausted");
            reply.map(LlmResponse::text_only)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    fn validator(provider: Arc<ScriptedProvider>, rounds: u32) -> TranscriptValidator {
        let limits = LimitsConfig {
            max_rps: 1000.0,
            ..Default::default()
        };
        let retrier = BackoffRetrier::new(
            RateLimiter::shared(&limits),
            RetryPolicy::default(),
            Duration::from_secs(120),
        );
        TranscriptValidator::new(provider, Arc::new(retrier), rounds)
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("transcribe", ImageInput::new(vec![1, 2, 3], "image/png"))
    }

    fn missing_date() -> String {
        let mut value = conformant_value();
        value["metadata"]
            .as_object_mut()
            .unwrap()
            .remove("document_date");
        value.to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_conformant_first_reply_needs_one_call() {
        let provider = ScriptedProvider::new(vec![Ok(conformant_value().to_string())]);
        let transcript = validator(Arc::clone(&provider), 1)
            .run(request())
            .await
            .unwrap();

        assert_eq!(transcript.metadata.document_date, "1976-05-01");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_repair_round_then_success() {
        let provider = ScriptedProvider::new(vec![
            Ok(missing_date()),
            Ok(conformant_value().to_string()),
        ]);
        let metrics = create_shared_metrics("repair-test");
        let result = validator(Arc::clone(&provider), 1)
            .with_metrics(Arc::clone(&metrics))
            .run(request())
            .await;

        assert!(result.is_ok());
        assert_eq!(provider.calls(), 2);
        assert_eq!(metrics.summary().repair_rounds, 1);

        let seen = provider.seen.lock().unwrap();
        let second = &seen[1];
        assert_eq!(second.turns.len(), 3);
        assert_eq!(second.turns[1].role, Role::Assistant);
        assert!(second.turns[2].text.contains("metadata.document_date"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_violation_is_fatal() {
        let provider = ScriptedProvider::new(vec![Ok(missing_date()), Ok(missing_date())]);
        let err = validator(Arc::clone(&provider), 1)
            .run(request())
            .await
            .unwrap_err();

        assert!(matches!(err, ScribeError::SchemaViolation(ref v) if v.len() == 1));
        assert!(err.to_string().contains("metadata.document_date"));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_reply_gets_no_repair_turn() {
        let provider = ScriptedProvider::new(vec![Ok("I am unable to read this page.".to_string())]);
        let err = validator(Arc::clone(&provider), 1)
            .run(request())
            .await
            .unwrap_err();

        assert!(matches!(err, ScribeError::MalformedResponse { .. }));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_retried_below_validation() {
        let provider = ScriptedProvider::new(vec![
            Err(LlmError::rate_limited("429").into()),
            Ok(conformant_value().to_string()),
        ]);
        let result = validator(Arc::clone(&provider), 1).run(request()).await;

        assert!(result.is_ok());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normalization_heals_without_repair() {
        let mut value = conformant_value();
        value["metadata"]["recipients"] = serde_json::json!("Allende");
        value["metadata"]["document_date"] = serde_json::json!("00-00-1976");
        let provider = ScriptedProvider::new(vec![Ok(value.to_string())]);

        let transcript = validator(Arc::clone(&provider), 0)
            .run(request())
            .await
            .unwrap();
        assert_eq!(transcript.metadata.recipients, vec!["Allende"]);
        assert_eq!(transcript.metadata.document_date, "1976-00-00");
        assert_eq!(provider.calls(), 1);
    }
}
