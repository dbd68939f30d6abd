//! Retry with exponential backoff
//!
//! Only transient transport failures are retried. A session whose handshake
//! failed is closed for good, so callers build a fresh client inside the
//! retried closure.

use crate::error::MCPError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

type Result<T> = std::result::Result<T, MCPError>;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound on any single delay
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            multiplier,
        }
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, 1.0)
    }

    /// Short delays, for tests and interactive tools
    pub fn fast() -> Self {
        Self::new(3, Duration::from_millis(10), Duration::from_millis(100), 2.0)
    }

    /// Delay to wait before retry number `retry` (1-based)
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let nanos = self.initial_backoff.as_nanos() as f64 * self.multiplier.powi(exponent);

        if !nanos.is_finite() || nanos >= self.max_backoff.as_nanos() as f64 {
            self.max_backoff
        } else {
            Duration::from_nanos(nanos.max(0.0).round() as u64)
        }
    }

    /// Whether another attempt could succeed where this one failed
    pub fn is_retryable(error: &MCPError) -> bool {
        matches!(error, MCPError::ConnectionFailed(_) | MCPError::Timeout(_))
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    ///
    /// The last error is returned when every attempt fails.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("{}: attempt {}/{}", operation_name, attempt, self.max_attempts);

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{}: succeeded after {} attempts", operation_name, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !Self::is_retryable(&error) {
                debug!("{}: not retrying: {}", operation_name, error);
                return Err(error);
            }

            if attempt >= self.max_attempts {
                warn!(
                    "{}: giving up after {} attempts: {}",
                    operation_name, attempt, error
                );
                return Err(error);
            }

            let backoff = self.backoff_duration(attempt);
            warn!(
                "{}: attempt {}/{} failed: {}. Retrying in {:?}",
                operation_name, attempt, self.max_attempts, error, backoff
            );
            sleep(backoff).await;
        }
    }
}
