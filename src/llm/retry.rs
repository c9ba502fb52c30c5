//! Shared exponential backoff retry logic for LLM providers.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

/// Attempt budget and backoff bounds for one provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    /// 3 total attempts, base 1s, max 30s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Default timeout for one provider subprocess (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Subprocess timeout from `var` (seconds), falling back to
/// [`DEFAULT_TIMEOUT_SECS`] when unset, empty or not a number.
pub fn timeout_from_env(var: &str) -> Duration {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!("Invalid {var} value '{v}', using default {DEFAULT_TIMEOUT_SECS}s");
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// Retry an async operation with exponential backoff.
///
/// `attempt` runs at most `policy.max_attempts` times (at least once). The
/// final error is passed through `wrap_exhausted` so callers can return
/// their own `RetriesExhausted` variant.
pub async fn retry_with_backoff<T, E, Fut, F, W>(
    policy: RetryPolicy,
    label: &str,
    mut attempt: F,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    W: FnOnce(E) -> E,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempt_no = 1;

    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if attempt_no >= max_attempts {
            warn!("{label}: all {max_attempts} attempts failed, last error: {err}");
            return Err(wrap_exhausted(err));
        }

        warn!("{label}: attempt {attempt_no}/{max_attempts} failed: {err}");
        if let Some(wait) = backoff.next_backoff() {
            tokio::time::sleep(wait).await;
        }
        attempt_no += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient(String),
        RetriesExhausted(Box<TestError>),
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn exhausted(e: TestError) -> TestError {
        TestError::RetriesExhausted(Box::new(e))
    }

    const VAR: &str = "HUNKCOMMIT_TEST_TIMEOUT";

    #[test]
    fn test_timeout_default_when_unset() {
        temp_env::with_var_unset(VAR, || {
            assert_eq!(timeout_from_env(VAR), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    fn test_timeout_from_env() {
        temp_env::with_var(VAR, Some("60"), || {
            assert_eq!(timeout_from_env(VAR), Duration::from_secs(60));
        });
    }

    #[test]
    fn test_timeout_invalid_or_empty_uses_default() {
        temp_env::with_var(VAR, Some("soon"), || {
            assert_eq!(timeout_from_env(VAR), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
        temp_env::with_var(VAR, Some(""), || {
            assert_eq!(timeout_from_env(VAR), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_first_attempt() {
        let result: Result<&str, TestError> =
            retry_with_backoff(RetryPolicy::default(), "test", || async { Ok("ok") }, exhausted)
                .await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_after_max_attempts() {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        let result: Result<(), TestError> = retry_with_backoff(
            RetryPolicy::default(),
            "test",
            move || {
                let c = count_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Transient("fail".to_string()))
                }
            },
            exhausted,
        )
        .await;

        assert!(matches!(result, Err(TestError::RetriesExhausted(_))));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_zero_attempts_still_runs_once() {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };

        let result: Result<(), TestError> = retry_with_backoff(
            policy,
            "test",
            move || {
                let c = count_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Transient("fail".to_string()))
                }
            },
            exhausted,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_failures() {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        let result: Result<&str, TestError> = retry_with_backoff(
            RetryPolicy::default(),
            "test",
            move || {
                let c = count_clone.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::Transient("transient".to_string()))
                    } else {
                        Ok("recovered")
                    }
                }
            },
            exhausted,
        )
        .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
