//! Exponential-backoff retry for fal API calls.
//!
//! [`with_retry`] repeats an operation while it fails with a transient
//! [`FalApiError`], waiting longer between each attempt. Permanent
//! failures are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::api::FalApiError;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
///
/// `operation` names the call in logs.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut op: F,
) -> Result<T, FalApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FalApiError>>,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "fal call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < config.max_attempts.max(1) => {
                tracing::warn!(
                    operation,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt {attempt} failed, retrying",
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, config);
            }
            Err(e) => return Err(e),
        }
    }
}
