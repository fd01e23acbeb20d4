//! Bounded retry with exponential backoff

use crate::backend::ClassifierError;
use semview_core::RetryConfig;
use std::future::Future;
use std::time::Duration;

/// Delay after a failed attempt: `base_delay_ms * 2^(attempt-1)`
pub fn backoff_delay(policy: &RetryConfig, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(policy.base_delay_ms.saturating_mul(factor))
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` attempts have been made
///
/// The operation receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(policy: &RetryConfig, mut operation: F) -> Result<T, ClassifierError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ClassifierError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) if attempt >= max_attempts => {
                return Err(ClassifierError::RetriesExhausted {
                    attempts: attempt,
                    last: error.to_string(),
                });
            }
            Err(error) => {
                let delay = backoff_delay(policy, attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "classification attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant(max_attempts: u32) -> RetryConfig {
        RetryConfig { max_attempts, base_delay_ms: 0 }
    }

    #[test]
    fn delays_double() {
        let policy = RetryConfig::default();
        assert_eq!(backoff_delay(&policy, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(&policy, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&policy, 3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(&policy, 200), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Cell::new(0);
        let result = with_retry(&instant(3), |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(ClassifierError::ServerError { status: 503, message: "busy".into() })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retryable_error() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(&instant(5), |_| {
            calls.set(calls.get() + 1);
            async { Err(ClassifierError::AuthenticationError("bad key".into())) }
        })
        .await;

        assert!(matches!(result, Err(ClassifierError::AuthenticationError(_))));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(&instant(2), |_| {
            calls.set(calls.get() + 1);
            async { Err(ClassifierError::RateLimited("429".into())) }
        })
        .await;

        assert_eq!(
            result,
            Err(ClassifierError::RetriesExhausted { attempts: 2, last: "Rate limited: 429".into() })
        );
        assert_eq!(calls.get(), 2);
    }
}
