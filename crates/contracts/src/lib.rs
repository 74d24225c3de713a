//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Delivery model
//! - A `Message` is immutable once built; its identity is the idempotency key
//! - A `DeliveryBackend` attempts one message and reports success or a failure
//! - Every terminal `DispatchOutcome` is handed to an `OutcomeReporter`

mod backend;
mod blueprint;
mod error;
mod message;
mod outcome;
mod reporter;

pub use backend::{BackendError, DeliveryBackend, DeliveryReceipt, FailureKind, LocalDeliveryBackend};
pub use blueprint::*;
pub use error::*;
pub use message::{Message, MessageId};
pub use outcome::{DispatchOutcome, OutcomeStatus};
pub use reporter::OutcomeReporter;
