//! Retrying requests the daemon may not be ready for yet.

use crate::{IpcError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often and how patiently to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Run `operation`, repeating it while it fails with a retryable error.
///
/// Non-retryable errors are returned at once. When every attempt fails,
/// the last error is returned.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(
                    "attempt {}/{} failed: {}. Retrying in {:.1}s",
                    attempt,
                    attempts,
                    e,
                    config.delay.as_secs_f32()
                );
                tokio::time::sleep(config.delay).await;
                attempt += 1;
            }
        }
    }
}

/// Whether an error returned by [`with_retry`] came from a daemon that never answered.
pub fn is_unreachable(err: &IpcError) -> bool {
    matches!(err, IpcError::Connect { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MsgType;
    use std::cell::Cell;
    use std::path::PathBuf;

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(max_attempts, Duration::from_millis(1))
    }

    fn refused() -> IpcError {
        IpcError::Connect {
            path: PathBuf::from("/nonexistent"),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let result = with_retry(&RetryConfig::new(1, Duration::ZERO), || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let attempts = Cell::new(0);
        let result = with_retry(&quick(3), || {
            attempts.set(attempts.get() + 1);
            let current = attempts.get();
            async move {
                if current < 3 {
                    Err(IpcError::Rejected {
                        request: MsgType::ReqInstall,
                        reason: None,
                    })
                } else {
                    Ok("started")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "started");
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test]
    async fn test_all_attempts_fail() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&quick(3), || {
            attempts.set(attempts.get() + 1);
            async { Err(refused()) }
        })
        .await;
        assert!(is_unreachable(&result.unwrap_err()));
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&quick(5), || {
            attempts.set(attempts.get() + 1);
            async { Err(IpcError::Closed) }
        })
        .await;
        assert!(matches!(result, Err(IpcError::Closed)));
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let attempts = Cell::new(0);
        let _: Result<()> = with_retry(&quick(0), || {
            attempts.set(attempts.get() + 1);
            async { Err(refused()) }
        })
        .await;
        assert_eq!(attempts.get(), 1);
    }
}
