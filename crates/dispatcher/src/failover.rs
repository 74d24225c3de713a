//! FailoverSequencer - walks the backend chain until one delivers

use contracts::{DeliveryReceipt, Message};
use tracing::{info, instrument, warn};

use crate::backend::BackendChain;
use crate::error::FailoverError;
use crate::retry::RetryExecutor;

/// Result of a successful failover sequence
#[derive(Debug, Clone)]
pub struct Delivery {
    pub receipt: DeliveryReceipt,
    /// Attempts made on the winning backend
    pub backend_attempts: u32,
    /// Attempts across every backend tried
    pub total_attempts: u32,
    /// Backends that were exhausted before the winner
    pub failed_over: usize,
}

/// Iterates backends in configured order, giving each its full retry budget
pub struct FailoverSequencer {
    backends: BackendChain,
    retry: RetryExecutor,
}

impl FailoverSequencer {
    pub fn new(backends: BackendChain, retry: RetryExecutor) -> Self {
        Self { backends, retry }
    }

    pub fn backends(&self) -> &BackendChain {
        &self.backends
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Deliver `message` through the first backend that succeeds
    ///
    /// # Errors
    /// `AllBackendsExhausted` carrying the last backend's terminal error.
    #[instrument(
        name = "failover_dispatch",
        skip(self, message),
        fields(backends = self.backends.len())
    )]
    pub async fn dispatch(&self, message: &Message) -> Result<Delivery, FailoverError> {
        let mut total_attempts = 0;
        let mut last = None;

        for (idx, backend) in self.backends.iter().enumerate() {
            match self.retry.execute(backend.as_ref(), message).await {
                Ok(attempted) => {
                    total_attempts += attempted.attempts;
                    if idx > 0 {
                        info!(
                            backend = %backend.name(),
                            failed_over = idx,
                            "Delivered after failover"
                        );
                    }
                    return Ok(Delivery {
                        receipt: attempted.receipt,
                        backend_attempts: attempted.attempts,
                        total_attempts,
                        failed_over: idx,
                    });
                }
                Err(exhausted) => {
                    total_attempts += exhausted.attempts;
                    warn!(
                        backend = %exhausted.backend,
                        attempts = exhausted.attempts,
                        error = %exhausted.source,
                        "Backend exhausted, failing over"
                    );
                    last = Some(exhausted);
                }
            }
        }

        match last {
            Some(last) => Err(FailoverError::AllBackendsExhausted {
                attempts: total_attempts,
                last,
            }),
            None => Err(FailoverError::NoBackends),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BackendError, DeliveryBackend};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Backend that either always fails or always succeeds
    struct FixedBackend {
        name: String,
        succeed: bool,
        calls: Arc<AtomicU32>,
    }

    impl FixedBackend {
        fn new(name: &str, succeed: bool) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let backend = Self {
                name: name.to_string(),
                succeed,
                calls: Arc::clone(&calls),
            };
            (backend, calls)
        }
    }

    impl DeliveryBackend for FixedBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn attempt(&self, _message: &Message) -> Result<DeliveryReceipt, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(DeliveryReceipt::new(&self.name))
            } else {
                Err(BackendError::transient(&self.name, "network error"))
            }
        }
    }

    fn message() -> Message {
        Message::new("recipient@example.com", "Test Email", "body").with_id("m-1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_backend_wins() {
        let (a, a_calls) = FixedBackend::new("provider-a", true);
        let (b, b_calls) = FixedBackend::new("provider-b", true);
        let sequencer = FailoverSequencer::new(
            BackendChain::new().with(a).with(b),
            RetryExecutor::new(5, Duration::from_secs(1)),
        );

        let delivery = sequencer.dispatch(&message()).await.unwrap();

        assert_eq!(delivery.receipt.backend, "provider-a");
        assert_eq!(delivery.total_attempts, 1);
        assert_eq!(delivery.failed_over, 0);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_over_to_second_backend() {
        let (a, a_calls) = FixedBackend::new("provider-a", false);
        let (b, b_calls) = FixedBackend::new("provider-b", true);
        let sequencer = FailoverSequencer::new(
            BackendChain::new().with(a).with(b),
            RetryExecutor::new(5, Duration::from_secs(1)),
        );

        let delivery = sequencer.dispatch(&message()).await.unwrap();

        assert_eq!(delivery.receipt.backend, "provider-b");
        assert_eq!(delivery.backend_attempts, 1);
        assert_eq!(delivery.total_attempts, 6);
        assert_eq!(delivery.failed_over, 1);
        assert_eq!(a_calls.load(Ordering::SeqCst), 5);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_backends_exhausted_reports_last() {
        let (a, a_calls) = FixedBackend::new("provider-a", false);
        let (b, b_calls) = FixedBackend::new("provider-b", false);
        let sequencer = FailoverSequencer::new(
            BackendChain::new().with(a).with(b),
            RetryExecutor::new(3, Duration::from_millis(10)),
        );

        let err = sequencer.dispatch(&message()).await.unwrap_err();

        match err {
            FailoverError::AllBackendsExhausted { attempts, last } => {
                assert_eq!(attempts, 6);
                assert_eq!(last.backend, "provider-b");
                assert_eq!(last.attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(a_calls.load(Ordering::SeqCst), 3);
        assert_eq!(b_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let sequencer = FailoverSequencer::new(
            BackendChain::new(),
            RetryExecutor::new(5, Duration::from_secs(1)),
        );
        assert!(matches!(
            sequencer.dispatch(&message()).await,
            Err(FailoverError::NoBackends)
        ));
    }
}
