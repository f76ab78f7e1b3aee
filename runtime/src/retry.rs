//! Bounded retry for startup connections.
//!
//! Broker and database connections are attempted a fixed number of times with
//! a delay between attempts. Exhausting the attempts surfaces the last error,
//! which the binaries treat as fatal.
//!
//! # Example
//!
//! ```rust
//! use brigade_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::fixed(5, Duration::from_secs(5));
//!
//! let connection = retry_with_backoff(&policy, "broker", || async {
//!     Ok::<_, String>("connected")
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `delay`: 5 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: usize,
    /// Delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Fixed delay between a bounded number of attempts.
    #[must_use]
    pub const fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Run `operation` until it succeeds or the policy's attempts are exhausted.
///
/// `target` names what is being attempted in log lines.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    target: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(target_name = target, attempt, "Connected after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt >= max_attempts => {
                tracing::error!(
                    target_name = target,
                    attempt,
                    error = %err,
                    "Giving up after max attempts"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay;
                tracing::warn!(
                    target_name = target,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Attempt failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_is_five_attempts_five_seconds_apart() {
        assert_eq!(
            RetryPolicy::default(),
            RetryPolicy::fixed(5, Duration::from_secs(5))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let calls = AtomicUsize::new(0);

        let result = retry_with_backoff(&RetryPolicy::fixed(0, Duration::from_secs(1)), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("refused") }
        })
        .await;

        assert_eq!(result, Err("refused"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_failures() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));

        let result = retry_with_backoff(&policy, "test", || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(format!("attempt {n} failed")) } else { Ok(42) }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_last_error_after_max_attempts() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));
        let started = tokio::time::Instant::now();

        let result = retry_with_backoff(&policy, "test", || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(format!("refused {n}"))
            }
        })
        .await;

        assert_eq!(result, Err("refused 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // four sleeps between five attempts
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }
}
