//! LogBackend - logs message summaries via tracing

use contracts::{BackendError, DeliveryBackend, DeliveryReceipt, Message};
use tracing::{info, instrument};

/// Backend that logs each message and always succeeds
pub struct LogBackend {
    name: String,
}

impl LogBackend {
    /// Create a new LogBackend with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DeliveryBackend for LogBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_backend_attempt", skip(self, message), fields(backend = %self.name))]
    async fn attempt(&self, message: &Message) -> Result<DeliveryReceipt, BackendError> {
        info!(
            backend = %self.name,
            message_id = message.id().map(|id| id.as_str()).unwrap_or("-"),
            from = message.sender().unwrap_or("-"),
            to = %message.to(),
            subject = %message.subject(),
            body_len = message.body().len(),
            payload_len = message.payload().len(),
            "Message delivered to log"
        );
        Ok(DeliveryReceipt::new(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_backend_always_succeeds() {
        let backend = LogBackend::new("console");
        let message = Message::new("recipient@example.com", "Test Email", "hello");

        let receipt = DeliveryBackend::attempt(&backend, &message).await.unwrap();
        assert_eq!(receipt.backend, "console");
        assert!(receipt.reference.is_none());
    }
}
