//! Bounded retry with exponential backoff for flaky page interactions.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::surface::DriverError;

/// Whether a failed driver operation is worth retrying.
///
/// Timeouts, missing elements and failed interactions are usually a DOM
/// that has not settled yet. Navigation and backend failures mean the
/// page or the browser itself is gone, so retrying the same operation
/// cannot help.
#[must_use]
pub fn is_transient(error: &DriverError) -> bool {
    matches!(
        error,
        DriverError::WaitTimeout { .. }
            | DriverError::NotFound { .. }
            | DriverError::Interaction { .. }
    )
}

/// Runs `operation` up to `1 + max_retries` times, doubling the delay
/// between attempts starting from `backoff_base_ms`.
///
/// Non-transient errors and the final transient error are returned to
/// the caller unchanged.
///
/// # Errors
///
/// Returns the last error produced by `operation` once retries are
/// exhausted or the error is not transient.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, DriverError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DriverError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if is_transient(&error) && attempt < max_retries => {
                let delay_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
                attempt += 1;
                warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %error,
                    "page interaction failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn timeout_error() -> DriverError {
        DriverError::WaitTimeout {
            selector: ".modal".into(),
            waited_ms: 10,
        }
    }

    #[test]
    fn timeouts_and_missing_elements_are_transient() {
        assert!(is_transient(&timeout_error()));
        assert!(is_transient(&DriverError::NotFound {
            selector: "tr".into()
        }));
        assert!(is_transient(&DriverError::Interaction {
            selector: "button".into(),
            reason: "not clickable".into(),
        }));
    }

    #[test]
    fn navigation_and_backend_failures_are_not() {
        assert!(!is_transient(&DriverError::Navigation {
            url: "https://example.se".into(),
            reason: "connection refused".into(),
        }));
        assert!(!is_transient(&DriverError::Backend("session lost".into())));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(3, 1, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(timeout_error())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(2, 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(timeout_error()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3, "one try plus two retries");
    }

    #[tokio::test]
    async fn does_not_retry_fatal_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(5, 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DriverError::Backend("browser crashed".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn survives_a_retry_budget_past_the_shift_width() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(70, 0, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(timeout_error()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 71, "one try plus seventy retries");
    }
}
