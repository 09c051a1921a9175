//! Bounded retry of transient failures with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use harvest_core::{HarvestError, RetryConfig};
use rand::Rng;

/// Add up to `jitter_percent` percent of random jitter to `base_ms`.
#[must_use]
pub fn jitter_wait(base_ms: u64, jitter_percent: u32) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, base_ms.saturating_mul(u64::from(jitter_percent)) / 100)
    };
    let mut rng = rand::rng();
    base_ms.saturating_add(rng.random_range(0..jitter_range))
}

/// Delay before retrying after `failed_attempts` failures, without jitter.
///
/// `min * factor^(failed_attempts - 1)`, capped at `max_backoff_ms`.
#[must_use]
pub fn backoff_delay(config: &RetryConfig, failed_attempts: u32) -> Duration {
    let exp = failed_attempts.saturating_sub(1);
    let factor = u64::from(config.factor.max(1));
    let ms = factor
        .checked_pow(exp)
        .and_then(|m| config.min_backoff_ms.checked_mul(m))
        .unwrap_or(u64::MAX)
        .min(config.max_backoff_ms);
    Duration::from_millis(ms)
}

/// Run `op` until it succeeds, fails with a non-retryable error, or runs out
/// of attempts.
///
/// `op` receives the 1-based attempt number. A retryable error that survives
/// the final attempt is returned as `RetriesExhausted`.
///
/// # Errors
/// Returns the first non-retryable error, or `RetriesExhausted`.
pub async fn retry_transient<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, HarvestError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, HarvestError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                return Err(HarvestError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
            Err(_e) => {
                let base = backoff_delay(config, attempt);
                let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
                let wait = jitter_wait(base_ms, u32::from(config.jitter_percent));
                #[cfg(feature = "tracing")]
                tracing::warn!(attempt, wait_ms = wait, error = %_e, "retrying transient failure");
                tokio::time::sleep(Duration::from_millis(wait)).await;
                attempt += 1;
            }
        }
    }
}
