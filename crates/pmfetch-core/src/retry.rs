//! Bounded retries with exponential backoff for transient upstream failures.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::http_client::HttpOutcome;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    /// 1s, 2s, 4s, ... without jitter.
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(60),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay before the retry that follows the 0-based `attempt`.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = base.as_secs_f64() * factor.powi(exponent);
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }

    /// Upper bound for any single delay.
    pub const fn ceiling(self) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential { max, .. } => max,
        }
    }
}

/// Configuration for the retry loop around one HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one; values below 1 act as 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Let a larger `Retry-After` hint replace the computed delay, capped at
    /// the backoff ceiling.
    pub honor_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            honor_retry_after: false,
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    /// A single attempt, no sleeping.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// The caller's cancellation token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Final outcome of a retried request and how many attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted {
    pub outcome: HttpOutcome,
    pub attempts: u32,
}

/// Runs an operation until it yields a non-transient outcome or attempts run out.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// `operation` receives the 1-based attempt number. No sleep follows the
    /// final attempt; its outcome is returned unchanged.
    pub async fn execute<F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<Attempted, Cancelled>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = HttpOutcome>,
    {
        let max_attempts = self.config.attempts();
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }

            attempt += 1;
            let outcome = operation(attempt).await;
            if !outcome.is_transient() || attempt >= max_attempts {
                return Ok(Attempted {
                    outcome,
                    attempts: attempt,
                });
            }

            let delay = self.delay_after(attempt - 1, &outcome);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %outcome.describe(),
                "transient upstream failure, backing off"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn delay_after(&self, attempt_index: u32, outcome: &HttpOutcome) -> Duration {
        let computed = self.config.delay_for_attempt(attempt_index);
        match outcome {
            HttpOutcome::RateLimited {
                retry_after: Some(hint),
            } if self.config.honor_retry_after && *hint > computed => {
                (*hint).min(self.config.backoff.ceiling()).max(computed)
            }
            _ => computed,
        }
    }
}
