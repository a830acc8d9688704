//! Retry policy: caller-side backoff around `MessageQueuePort::send`.
//!
//! The port makes exactly one attempt per call. Whether to try again is decided
//! here, by the producer:
//! - `ValidationError` and `Rejected` deliveries are returned immediately.
//! - Retryable deliveries (unreachable / throttled / timeout) are retried with
//!   exponential backoff until `max_attempts` is reached.
//!
//! Resending is safe because the dedup key travels with the message.

use std::time::Duration;

use tracing::warn;

use crate::domain::{DeliveryOptions, LeadQueueMessage, SendError};
use crate::ports::MessageQueuePort;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Base delay for the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for a single delay.
    pub max_delay: Duration,

    /// Total attempts including the first one.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// 200ms, x2, capped at 5s, 5 attempts.
    pub fn default_v1() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            max_attempts: 5,
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            max_attempts: 1,
        }
    }

    /// Calculate delay for the next retry based on attempt number.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    ///
    /// delay = base_delay * multiplier^(attempts - 1), capped at `max_delay`.
    ///
    /// Example with base_delay=200ms, multiplier=2.0:
    /// - attempt 1 (first failure): 200ms
    /// - attempt 2: 400ms
    /// - attempt 3: 800ms
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs.max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_v1()
    }
}

/// Send with caller-side retries. Returns the last error once attempts run out.
pub async fn send_with_retry<P>(
    port: &P,
    message: LeadQueueMessage,
    options: DeliveryOptions,
    policy: &RetryPolicy,
) -> Result<(), SendError>
where
    P: MessageQueuePort + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match port.send(message.clone(), options.clone()).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_retryable() && attempts < max_attempts => {
                let delay = policy.next_delay(attempts);
                warn!(
                    error = %err,
                    attempts,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    group_id = %options.group_id,
                    "send failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
