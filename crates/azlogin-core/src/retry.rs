// SPDX-License-Identifier: Apache-2.0

//! Retry logic with exponential backoff for transient identity-service failures.
//!
//! Provides helpers to detect retryable errors and configure exponential backoff
//! with jitter for token endpoint requests.

use backon::ExponentialBuilder;

use crate::error::AuthError;

/// Determines if an HTTP status code is retryable.
///
/// Retryable status codes are:
/// - 429 (Too Many Requests / Rate Limited)
/// - 500 (Internal Server Error)
/// - 502 (Bad Gateway)
/// - 503 (Service Unavailable)
/// - 504 (Gateway Timeout)
#[must_use]
pub fn is_retryable_http(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Determines if an identity error is transient and worth retrying.
///
/// Retries network timeouts and connection failures, and identity-service
/// responses with a retryable status code. OAuth protocol errors such as
/// `invalid_grant` are never retried.
#[must_use]
pub fn is_retryable_auth(e: &AuthError) -> bool {
    match e {
        AuthError::Network(err) => {
            if err.is_timeout() || err.is_connect() {
                return true;
            }
            err.status().is_some_and(|s| is_retryable_http(s.as_u16()))
        }
        AuthError::Identity { status, .. } => is_retryable_http(*status),
        _ => false,
    }
}

/// Creates a configured exponential backoff builder for retries.
///
/// - Factor: 2 (exponential growth)
/// - Min delay: 1 second
/// - Max times: 3
/// - Jitter: enabled
#[must_use]
pub fn retry_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_factor(2.0)
        .with_min_delay(std::time::Duration::from_secs(1))
        .with_max_times(3)
        .with_jitter()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use backon::Retryable;

    use super::*;

    fn identity(status: u16) -> AuthError {
        AuthError::Identity {
            status,
            code: "temporarily_unavailable".to_string(),
            message: "try later".to_string(),
        }
    }

    #[test]
    fn test_is_retryable_http_retryable_codes() {
        assert!(is_retryable_http(429));
        assert!(is_retryable_http(500));
        assert!(is_retryable_http(502));
        assert!(is_retryable_http(503));
        assert!(is_retryable_http(504));
    }

    #[test]
    fn test_is_retryable_http_non_retryable_codes() {
        assert!(!is_retryable_http(400));
        assert!(!is_retryable_http(401));
        assert!(!is_retryable_http(403));
        assert!(!is_retryable_http(404));
        assert!(!is_retryable_http(200));
    }

    #[test]
    fn test_identity_errors_follow_status() {
        assert!(is_retryable_auth(&identity(503)));
        assert!(!is_retryable_auth(&identity(400)));
    }

    #[test]
    fn test_protocol_errors_not_retryable() {
        assert!(!is_retryable_auth(&AuthError::InteractionRequired {
            message: "consent revoked".to_string(),
        }));
        assert!(!is_retryable_auth(&AuthError::Config {
            message: "bad".to_string(),
        }));
    }

    async fn attempts_until_done(error: fn() -> AuthError) -> (usize, Result<(), AuthError>) {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result = (|| async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(error())
        })
        .retry(retry_backoff())
        .when(is_retryable_auth)
        .await;
        (counter.load(Ordering::SeqCst), result)
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried_three_times() {
        let (attempts, result) = attempts_until_done(|| identity(503)).await;
        assert_eq!(attempts, 4);
        assert!(matches!(result, Err(AuthError::Identity { status: 503, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_protocol_errors_fail_on_first_attempt() {
        let (attempts, result) = attempts_until_done(|| AuthError::InteractionRequired {
            message: "consent revoked".to_string(),
        })
        .await;
        assert_eq!(attempts, 1);
        assert!(matches!(result, Err(AuthError::InteractionRequired { .. })));
    }
}
