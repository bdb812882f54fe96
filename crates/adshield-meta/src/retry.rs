use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::error::{MetaError, Result};

/// Bounded retry policy for Graph API reads.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = retries + 1).
    pub retries: u32,
    /// Base backoff delay, doubled per attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay: Duration::from_millis(600),
        }
    }
}

/// Run `op` with exponential backoff and jitter, retrying only errors for
/// which [`MetaError::is_retryable`] holds. This is the ONLY retry layer in
/// the system; webhook dispatch deliberately has none.
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.retries && e.is_retryable() => {
                let jitter = rand::thread_rng().gen_range(0..200);
                let backoff = policy.base_delay * 2u32.pow(attempt)
                    + Duration::from_millis(jitter);
                tracing::warn!(
                    attempt = attempt + 1,
                    error = %e,
                    backoff_ms = backoff.as_millis() as u64,
                    "Graph API call failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick() -> RetryPolicy {
        RetryPolicy {
            retries: 2,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_retryable_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retries(quick(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(MetaError::Http {
                        status: 503,
                        body: String::new(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_retries(quick(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(MetaError::Http {
                    status: 400,
                    body: String::new(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_retries(quick(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(MetaError::Http {
                    status: 500,
                    body: String::new(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
