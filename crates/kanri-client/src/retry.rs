//! Bounded retry for transient repository failures.
//!
//! Reads retry more aggressively than writes. Only errors classified as
//! retryable (network failures, 5xx) are retried; validation, 4xx and
//! not-found errors surface immediately. Retries are invisible to cache
//! consumers — they observe a single pending operation.

use kanri_core::config::KanriConfig;
use kanri_core::error::Result;
use std::future::Future;
use std::time::Duration;

/// A bounded retry policy: the operation runs once plus up to `retries`
/// additional attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            delay: Duration::from_millis(100),
        }
    }

    /// The configured policy for read operations.
    pub fn read(config: &KanriConfig) -> Self {
        Self::new(config.read_retries)
    }

    /// The configured policy for write operations.
    pub fn write(config: &KanriConfig) -> Self {
        Self::new(config.write_retries)
    }

    /// Runs `op`, retrying transient failures with a short linear backoff.
    ///
    /// The caller-visible result fails only after attempts exhaust, and
    /// carries the last error observed.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        op = op_name,
                        attempt,
                        max = self.retries,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(self.delay * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanri_core::KanriError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2);

        let result = policy
            .run("list", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(KanriError::network("connection reset"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2);

        let result: Result<()> = policy
            .run("update", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(KanriError::api(400, "bad request")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1);

        let result: Result<()> = policy
            .run("list", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(KanriError::api(503, "unavailable")) }
            })
            .await;

        assert_eq!(result.unwrap_err(), KanriError::api(503, "unavailable"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
