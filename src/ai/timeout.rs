//! Inference Timeouts
//!
//! Every inference attempt runs under a ceiling. An expired attempt surfaces
//! as [`ScribeError::Timeout`], which the backoff layer treats as terminal.

use std::future::Future;
use std::time::Duration;

use crate::types::{Result, ScribeError};

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
///
/// ```ignore
/// let response = with_timeout(
///     Duration::from_secs(120),
///     provider.complete(&request),
///     "inference call",
/// ).await?;
/// ```
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ScribeError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, ScribeError>(42) },
            "inference call",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires_as_terminal() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, ScribeError>(42)
            },
            "inference call",
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ScribeError::Timeout { .. }));
        assert!(!err.is_retryable());
    }
}
