//! Retry manager for provider calls
//!
//! Bounded retry with either binary exponential backoff (with jitter) or a
//! fixed delay between attempts. Which errors are retried is decided by a
//! predicate; the default retries transient provider failures.

use crate::errors::{AssistantError, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Default maximum attempts
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (1 second)
const BASE_DELAY_MS: u64 = 1000;

/// Maximum delay cap (16 seconds)
const MAX_DELAY_MS: u64 = 16000;

/// Delay strategy between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// base * 2^attempt, capped, with optional jitter
    Exponential { base_delay_ms: u64, max_delay_ms: u64 },
    /// Same wait before every retry
    Fixed { delay_ms: u64 },
}

/// Retry manager
#[derive(Debug, Clone)]
pub struct RetryManager {
    /// Maximum attempts, including the first call
    max_attempts: u32,

    backoff: Backoff,

    /// ±25% random variation on exponential delays
    enable_jitter: bool,

    /// Label used in log lines
    label: String,
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryManager {
    /// Exponential backoff with default settings
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: Backoff::Exponential {
                base_delay_ms: BASE_DELAY_MS,
                max_delay_ms: MAX_DELAY_MS,
            },
            enable_jitter: true,
            label: "provider".to_string(),
        }
    }

    /// Exponential backoff with custom attempts and base delay
    pub fn exponential(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                base_delay_ms,
                max_delay_ms: MAX_DELAY_MS,
            },
            enable_jitter: true,
            label: "provider".to_string(),
        }
    }

    /// Fixed wait between attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed {
                delay_ms: delay.as_millis() as u64,
            },
            enable_jitter: false,
            label: "provider".to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.enable_jitter = false;
        self
    }

    /// Execute operation, retrying transient failures
    pub async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        self.execute_with_retry_when(operation, AssistantError::is_transient)
            .await
    }

    /// Execute operation, retrying errors accepted by `should_retry`.
    /// The last error is returned once attempts run out.
    pub async fn execute_with_retry_when<F, Fut, T, P>(
        &self,
        mut operation: F,
        should_retry: P,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
        P: Fn(&AssistantError) -> bool,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !should_retry(&e) {
                        return Err(e);
                    }

                    attempt += 1;

                    if attempt >= self.max_attempts {
                        warn!(
                            label = %self.label,
                            attempts = attempt,
                            error = %e,
                            "retries exhausted"
                        );
                        return Err(e);
                    }

                    let delay = self.calculate_delay(attempt);
                    warn!(
                        label = %self.label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after failure"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Calculate delay for given attempt number
    fn calculate_delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential {
                base_delay_ms,
                max_delay_ms,
            } => {
                let exponential_delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
                let delay_ms = exponential_delay.min(max_delay_ms);

                let final_delay = if self.enable_jitter {
                    let jitter = (delay_ms / 4) as i64;
                    let random_jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter as f64;
                    ((delay_ms as i64) + random_jitter as i64).max(0) as u64
                } else {
                    delay_ms
                };

                Duration::from_millis(final_delay)
            }
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }
}
