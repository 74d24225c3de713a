//! RetryExecutor - bounded retries of one backend with exponential backoff

use std::time::Duration;

use contracts::{DeliveryReceipt, Message};
use ::metrics::counter;
use tokio::time;
use tracing::{debug, instrument, warn};

use crate::backend::SharedBackend;
use crate::error::BackendExhausted;

/// Delay after the `failures`-th failed attempt: `base * 2^failures`
///
/// Saturates instead of overflowing.
pub fn backoff_delay(base: Duration, failures: u32) -> Duration {
    let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Successful run of the retry loop
#[derive(Debug, Clone)]
pub struct Attempted {
    pub receipt: DeliveryReceipt,
    /// Attempts made on this backend, including the successful one
    pub attempts: u32,
}

/// Drives repeated attempts against a single backend
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryExecutor {
    /// `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Backoff before the attempt following `failures` failed ones
    pub fn delay_for(&self, failures: u32) -> Duration {
        backoff_delay(self.base_delay, failures)
    }

    /// Attempt delivery until success, a permanent failure, or the budget runs out
    ///
    /// Backoff suspends only this future; the caller's task yields to others.
    #[instrument(
        name = "retry_execute",
        skip(self, backend, message),
        fields(backend = %backend.name(), max_attempts = self.max_attempts)
    )]
    pub async fn execute(
        &self,
        backend: &dyn SharedBackend,
        message: &Message,
    ) -> Result<Attempted, BackendExhausted> {
        let mut failures: u32 = 0;

        loop {
            let result = backend.attempt(message).await;
            record_attempt(backend.name(), &result);

            match result {
                Ok(receipt) => {
                    return Ok(Attempted {
                        receipt,
                        attempts: failures + 1,
                    });
                }
                Err(error) => {
                    failures += 1;

                    if error.is_permanent() || failures >= self.max_attempts {
                        warn!(
                            backend = %backend.name(),
                            attempts = failures,
                            error = %error,
                            "Backend retry budget exhausted"
                        );
                        return Err(BackendExhausted {
                            backend: backend.name().to_string(),
                            attempts: failures,
                            source: error,
                        });
                    }

                    let delay = self.delay_for(failures);
                    debug!(
                        backend = %backend.name(),
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, backing off"
                    );
                    time::sleep(delay).await;
                }
            }
        }
    }
}

fn record_attempt(backend: &str, result: &Result<DeliveryReceipt, contracts::BackendError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) if e.is_permanent() => "permanent",
        Err(_) => "transient",
    };
    counter!(
        "courier_backend_attempts_total",
        "backend" => backend.to_string(),
        "result" => outcome
    )
    .increment(1);
}
