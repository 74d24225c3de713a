//! DeliveryBackend trait - Dispatcher output interface
//!
//! Defines the abstract interface for delivery backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::Message;

/// Delivery backend trait
///
/// All backends must implement this trait. Backends are shared between
/// concurrent deliveries, so `attempt` takes `&self`.
#[trait_variant::make(DeliveryBackend: Send)]
pub trait LocalDeliveryBackend {
    /// Backend name (used for logging/metrics and outcome attribution)
    fn name(&self) -> &str;

    /// Attempt a single delivery of `message`
    ///
    /// # Errors
    /// Returns a transient failure (retried) or a permanent failure
    /// (the dispatcher moves on to the next backend).
    async fn attempt(&self, message: &Message) -> Result<DeliveryReceipt, BackendError>;
}

/// Successful delivery acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Name of the backend that accepted the message
    pub backend: String,

    /// Backend-specific reference (queue id, spool location, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl DeliveryReceipt {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Worth retrying on the same backend
    #[default]
    Transient,
    /// Retrying the same backend cannot help
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

/// Error returned by a single backend attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend '{backend}' {kind} failure: {message}")]
pub struct BackendError {
    pub backend: String,
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    /// Create a transient failure
    pub fn transient(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    /// Create a permanent failure
    pub fn permanent(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == FailureKind::Permanent
    }
}
