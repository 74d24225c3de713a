//! DispatchOutcome - result of a `Send`
//!
//! Terminal outcomes (`Delivered`, `Failed`) are produced once per accepted
//! message and handed to the observability hook. `Duplicate` and `Queued`
//! are immediate answers to the caller only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeliveryReceipt, MessageId};

/// Outcome of dispatching one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub message_id: MessageId,
    pub status: OutcomeStatus,
    pub timestamp: DateTime<Utc>,
}

/// Outcome status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// A backend accepted the message
    Delivered {
        backend: String,
        /// Attempts across all backends, including the successful one
        attempts: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },

    /// Every backend exhausted its retry budget
    Failed { error: String, attempts: u32 },

    /// Identity already admitted; no backend was touched
    Duplicate,

    /// Deferred by the rate limiter; delivery is not guaranteed yet
    Queued {
        /// 1-based position in the pending queue at enqueue time
        position: usize,
    },
}

impl DispatchOutcome {
    fn now(message_id: MessageId, status: OutcomeStatus) -> Self {
        Self {
            message_id,
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn delivered(message_id: MessageId, receipt: DeliveryReceipt, attempts: u32) -> Self {
        Self::now(
            message_id,
            OutcomeStatus::Delivered {
                backend: receipt.backend,
                attempts,
                reference: receipt.reference,
            },
        )
    }

    pub fn failed(message_id: MessageId, error: impl Into<String>, attempts: u32) -> Self {
        Self::now(
            message_id,
            OutcomeStatus::Failed {
                error: error.into(),
                attempts,
            },
        )
    }

    pub fn duplicate(message_id: MessageId) -> Self {
        Self::now(message_id, OutcomeStatus::Duplicate)
    }

    pub fn queued(message_id: MessageId, position: usize) -> Self {
        Self::now(message_id, OutcomeStatus::Queued { position })
    }

    /// True only when a backend accepted the message
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Delivered { .. })
    }

    /// True for outcomes that end a message's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Delivered { .. } | OutcomeStatus::Failed { .. }
        )
    }

    /// Winning backend, if delivered
    pub fn backend(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Delivered { backend, .. } => Some(backend),
            _ => None,
        }
    }

    /// Backend attempts spent, if terminal
    pub fn attempts(&self) -> Option<u32> {
        match self.status {
            OutcomeStatus::Delivered { attempts, .. } | OutcomeStatus::Failed { attempts, .. } => {
                Some(attempts)
            }
            _ => None,
        }
    }

    /// Short status label for logs and metrics
    pub fn status_label(&self) -> &'static str {
        match self.status {
            OutcomeStatus::Delivered { .. } => "delivered",
            OutcomeStatus::Failed { .. } => "failed",
            OutcomeStatus::Duplicate => "duplicate",
            OutcomeStatus::Queued { .. } => "queued",
        }
    }
}
