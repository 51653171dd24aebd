//! Retry with exponential backoff for remote operations.
//!
//! Every remote call made by the agent and chat clients goes through
//! [`retry_with_backoff`]. Transient failures are retried with a delay of
//! `base_delay * 2^(attempt-1)` plus 10-30% jitter; anything else aborts on
//! the first attempt.

use crate::error::FoundryError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Largest exponent applied to the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Backoff configuration for one class of remote calls.
///
/// # Examples
///
/// ```
/// use foundry_kit::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(5).with_base_delay(Duration::from_millis(250));
/// assert_eq!(policy.max_attempts, 5);
/// assert_eq!(policy.backoff_delay(3), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never below 1.
    pub max_attempts: u32,

    /// Delay before the first retry, before jitter.
    pub base_delay: Duration,

    /// Lower bound of the jitter, as a fraction of the backoff delay.
    pub jitter_min: f64,

    /// Upper bound of the jitter, as a fraction of the backoff delay.
    pub jitter_max: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter_min: 0.1,
            jitter_max: 0.3,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the jitter range. Negative bounds are clamped to zero and the
    /// bounds are swapped if given in the wrong order.
    pub fn with_jitter(mut self, min: f64, max: f64) -> Self {
        let (min, max) = (min.max(0.0), max.max(0.0));
        self.jitter_min = min.min(max);
        self.jitter_max = min.max(max);
        self
    }

    /// Backoff delay after the given failed attempt (1-based), without jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Backoff delay plus a jitter sampled uniformly from the configured range.
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.backoff_delay(attempt);
        let factor = if self.jitter_max > self.jitter_min {
            rng.gen_range(self.jitter_min..=self.jitter_max)
        } else {
            self.jitter_min
        };
        let jitter = Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX);
        delay.saturating_add(jitter)
    }
}

/// Executes an operation with retry logic.
///
/// - Transient errors ([`FoundryError::is_retryable`]) are retried until
///   `policy.max_attempts` is reached.
/// - Non-transient errors abort immediately.
/// - The surfaced error is always wrapped in [`FoundryError::Operation`]
///   carrying `operation` and the number of attempts made.
///
/// # Examples
///
/// ```rust,ignore
/// use foundry_kit::retry::{RetryPolicy, retry_with_backoff};
///
/// let thread = retry_with_backoff(&RetryPolicy::default(), "create_thread", || {
///     service.create_thread()
/// })
/// .await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, FoundryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FoundryError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match op().await {
            Ok(output) => {
                if attempts > 1 {
                    info!(
                        operation,
                        attempt = attempts,
                        max_attempts,
                        "✅ Operation succeeded after retry"
                    );
                }
                return Ok(output);
            }
            Err(e) if e.is_retryable() && attempts < max_attempts => {
                let delay = policy.delay_for(attempts, &mut rand::thread_rng());
                warn!(
                    operation,
                    attempt = attempts,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "⚠️ Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    error!(
                        operation,
                        attempts,
                        error = %e,
                        "❌ Operation failed, max attempts exhausted"
                    );
                } else {
                    error!(
                        operation,
                        attempts,
                        error = %e,
                        "❌ Operation failed with non-retryable error"
                    );
                }
                return Err(e.in_operation(operation, attempts));
            }
        }
    }
}
