//! Bounded exponential backoff for store calls.

use crate::store::StoreError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff configuration for retried store calls.
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
    /// Total attempts including the first call.
    pub max_attempts: u32,
    /// Largest jitter added to a delay, as a fraction of it.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            max_attempts: 4,
            jitter: 0.25,
        }
    }
}

impl BackoffConfig {
    /// A config without delays, for tests and local tools.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            max_attempts,
            jitter: 0.0,
        }
    }
}

/// Tracks attempts for one logical call.
#[derive(Clone, Debug)]
pub struct BackoffState {
    config: BackoffConfig,
    failures: u32,
}

impl BackoffState {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record a failure and return the delay before the next attempt,
    /// or `None` once every attempt is spent.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.config.max_attempts.max(1) {
            return None;
        }

        let delay_ms = self.config.initial_delay.as_millis() as f64
            * self.config.multiplier.powi((self.failures - 1) as i32);
        let delay_ms = delay_ms.min(self.config.max_delay.as_millis() as f64);

        let delay_ms = if self.config.jitter > 0.0 {
            delay_ms + delay_ms * self.config.jitter * rand::thread_rng().gen_range(0.0..=1.0)
        } else {
            delay_ms
        };

        Some(Duration::from_millis(delay_ms as u64))
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Retry policy applied to every store call.
#[derive(Clone)]
pub struct RetryPolicy {
    pub backoff: BackoffConfig,
    /// Decides which errors are worth another attempt.
    pub is_retryable: fn(&StoreError) -> bool,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(backoff: BackoffConfig) -> Self {
        Self {
            backoff,
            is_retryable: StoreError::is_retryable,
        }
    }

    pub fn with_predicate(mut self, is_retryable: fn(&StoreError) -> bool) -> Self {
        self.is_retryable = is_retryable;
        self
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    /// Each attempt awaits a fresh future from `call`.
    ///
    /// The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut state = BackoffState::new(self.backoff.clone());
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if (self.is_retryable)(&err) => match state.record_failure() {
                    Some(delay) => {
                        warn!(
                            operation,
                            attempt = state.failures(),
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Retrying store call"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        warn!(operation, attempts = state.failures(), error = %err, "Store call retries exhausted");
                        return Err(err);
                    }
                },
                Err(err) => {
                    debug!(operation, error = %err, "Store call failed permanently");
                    return Err(err);
                }
            }
        }
    }
}
