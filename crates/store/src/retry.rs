//! Bounded retry with backoff for store round trips
//!
//! Every store, commit table, and timestamp authority call is retryable
//! I/O with a bounded budget. The helper here retries the whole operation
//! and surfaces the last error once the budget is exhausted.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry budget for one logical operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the first retry; doubled after each further failure.
    pub initial_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
        }
    }
}

impl RetryConfig {
    /// A budget that never retries, for tests that assert first-failure paths.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }
}

/// Runs `op` until it succeeds or the budget is exhausted.
pub async fn with_retries<T, E, F, Fut>(
    config: &RetryConfig,
    what: &str,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = config.initial_backoff;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_attempts => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}",
                    what,
                    attempt,
                    config.max_attempts,
                    e
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "{} failed, retry budget exhausted after {} attempts: {}",
                    what,
                    attempt,
                    e
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
        };

        let result: Result<u32, String> = with_retries(&config, "op", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_surfaces_last_error_when_exhausted() {
        let config = RetryConfig {
            max_attempts: 2,
            initial_backoff: Duration::ZERO,
        };

        let result: Result<(), String> =
            with_retries(&config, "op", || async { Err("down".to_string()) }).await;

        assert_eq!(result.unwrap_err(), "down");
    }
}
