//! Retry policy for transport operations.
//!
//! The retry discipline is defined once here rather than scattered through
//! the per-transport code paths: a bounded attempt loop with fixed spacing
//! for radio commands, and an eligibility predicate for the one-shot
//! transport-to-transport fallback the controller performs.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result, TransportFailureReason};

/// Attempt budget for a retried operation.
///
/// `max_attempts` counts every attempt including the first; a budget of 3
/// means at most three calls. Resolved per device from device-level config,
/// falling back to platform-level config, falling back to hard defaults
/// (2 attempts, 3000 ms), and immutable for the device's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Total attempts (first try included). Treated as at least 1.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Add up to 25% random jitter to the delay.
    pub jitter: bool,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_millis(3000),
            jitter: false,
        }
    }
}

impl RetryBudget {
    /// Create a budget with a custom attempt count and default spacing.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Single attempt, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the inter-attempt delay.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    fn spacing(&self) -> Duration {
        if self.jitter {
            let factor = 1.0 + rand::rng().random::<f64>() * 0.25;
            Duration::from_secs_f64(self.delay.as_secs_f64() * factor)
        } else {
            self.delay
        }
    }
}

/// Execute an async operation under a retry budget.
///
/// Attempts run until one succeeds, a non-retryable error occurs, or the
/// budget is exhausted; attempts are separated by the budget's fixed delay.
/// Parse, classification and configuration errors are returned immediately —
/// repeating those would fail identically.
pub async fn with_retry<F, Fut, T>(budget: &RetryBudget, operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = budget.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}/{}", operation_name, attempt, attempts);
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                last_error = Some(e);

                if attempt < attempts {
                    let delay = budget.spacing();
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}",
                        operation_name, attempt, attempts, delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        Error::TransportFailure(TransportFailureReason::CommandFailed(format!(
            "{operation_name} failed with no error"
        )))
    }))
}
