use std::{future::Future, time::Duration};

use backoff::backoff::Backoff;
use castline_types::FetchError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How a single upstream request is retried.
///
/// Every attempt that fails with an error accepted by `retryable` is followed
/// by a fixed `delay`, up to `max_attempts` attempts in total. A request that
/// keeps failing this way is reported as unavailable (`Ok(None)`) rather than
/// as an error, so that one bad key does not sink a whole run. Any other
/// error is returned immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub retryable: fn(&FetchError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            retryable: FetchError::is_transient,
        }
    }
}

/// Constant delay between attempts, stops after `retries` retries.
struct FixedDelay {
    delay: Duration,
    retries: u32,
    remaining: u32,
}

impl FixedDelay {
    fn new(max_attempts: u32, delay: Duration) -> Self {
        let retries = max_attempts.saturating_sub(1);
        Self { delay, retries, remaining: retries }
    }
}

impl Backoff for FixedDelay {
    fn reset(&mut self) {
        self.remaining = self.retries;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay, ..Default::default() }
    }

    pub fn with_predicate(mut self, retryable: fn(&FetchError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<Option<T>, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let retryable = self.retryable;
        let backoff = FixedDelay::new(self.max_attempts, self.delay);

        let result = backoff::future::retry_notify(
            backoff,
            || {
                let attempt = op();
                async move {
                    attempt.await.map_err(|err| {
                        if retryable(&err) {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: FetchError, wait: Duration| {
                tracing::warn!("{} failed: {}. Retrying in {:?}", label, err, wait);
            },
        )
        .await;

        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if retryable(&err) => {
                tracing::warn!(
                    "{} unavailable after {} attempts, last error: {}",
                    label,
                    self.max_attempts.max(1),
                    err
                );
                Ok(None)
            }
            Err(err) => {
                tracing::debug!("{} failed permanently: {}", label, err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    fn server_error() -> FetchError {
        FetchError::Status { url: "https://api.example.com".to_string(), status: 503 }
    }

    #[tokio::test]
    async fn test_run_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fast_policy(3)
            .run("users page", || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(server_error())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(Some(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_exhausted_is_unavailable() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<Option<()>, _> = fast_policy(3)
            .run("profile", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::EmptyResponse { url: "https://api.example.com".to_string() })
                }
            })
            .await;

        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<Option<()>, _> = fast_policy(5)
            .run("profile", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Status { url: "https://api.example.com".to_string(), status: 401 })
                }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Status { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_custom_predicate() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(4).with_predicate(|_| false);
        let result: Result<Option<()>, _> = policy
            .run("page", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(server_error())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<Option<()>, _> = fast_policy(1)
            .run("page", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(server_error())
                }
            })
            .await;

        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fixed_delay_resets() {
        let mut backoff = FixedDelay::new(3, Duration::from_millis(10));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(10)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(10)));
        assert_eq!(backoff.next_backoff(), None);
        backoff.reset();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(10)));
    }
}
