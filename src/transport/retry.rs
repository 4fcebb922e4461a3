//! Bounded exponential-backoff retry for transient gateway failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cancel::{run_cancellable, CancelSignal};
use crate::error::AetherResult;

/// Retry policy for one call. Copied per request, never shared mutably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Scale each delay by a random factor in `[0.5, 1.5)`
    pub jitter: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
            jitter: true,
        }
    }
}

impl RetryOptions {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// `min(base * 2^attempt, max)` before jitter.
    pub fn capped_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Delay to wait before retrying after failed attempt `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.capped_delay(attempt);
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..1.5))
        } else {
            delay
        }
    }
}

/// Run `operation`, re-invoking it on retryable failures.
///
/// Attempts are strictly sequential. The last error is returned unchanged
/// once retries are exhausted or a non-retryable error occurs. A cancelled
/// signal aborts the wait between attempts.
pub async fn with_retry<T, F, Fut>(
    options: &RetryOptions,
    cancel: Option<&CancelSignal>,
    mut operation: F,
) -> AetherResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AetherResult<T>>,
{
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= options.max_retries || !err.is_retryable() {
            return Err(err);
        }

        let delay = options.delay_for(attempt);
        warn!(
            "Request failed ({}), retrying in {:?} (attempt {}/{})",
            err,
            delay,
            attempt + 1,
            options.max_retries
        );
        run_cancellable(cancel, tokio::time::sleep(delay)).await?;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = RetryOptions::default();
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.base_delay_ms, 200);
        assert_eq!(opts.max_delay_ms, 2000);
        assert!(opts.jitter);
        assert_eq!(RetryOptions::none().max_retries, 0);
    }

    #[test]
    fn test_exponential_growth_is_capped() {
        let opts = RetryOptions {
            jitter: false,
            ..RetryOptions::default()
        };
        let delays: Vec<u128> = (0..6).map(|n| opts.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![200, 400, 800, 1600, 2000, 2000]);
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let opts = RetryOptions {
            jitter: false,
            ..RetryOptions::default()
        };
        assert_eq!(opts.delay_for(200), Duration::from_millis(2000));
        assert_eq!(opts.delay_for(63), Duration::from_millis(2000));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let opts = RetryOptions::default();
        for attempt in 0..5 {
            let base = opts.capped_delay(attempt).as_secs_f64();
            for _ in 0..50 {
                let d = opts.delay_for(attempt).as_secs_f64();
                assert!(d >= base * 0.5 - 1e-9, "{} < {}", d, base * 0.5);
                assert!(d < base * 1.5 + 1e-9, "{} >= {}", d, base * 1.5);
            }
        }
    }

    #[test]
    fn test_deserialize_partial_options() {
        let opts: RetryOptions = serde_json::from_str(r#"{"max_retries": 5, "jitter": false}"#).unwrap();
        assert_eq!(opts.max_retries, 5);
        assert_eq!(opts.base_delay_ms, 200);
        assert!(!opts.jitter);
    }
}
