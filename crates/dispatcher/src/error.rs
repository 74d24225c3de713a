//! Dispatcher error types

use contracts::{BackendError, MessageId};
use thiserror::Error;

/// Construction-time errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// No backend configured
    #[error("at least one delivery backend is required")]
    NoBackends,

    /// Invalid dispatcher configuration
    #[error("invalid dispatcher config '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// Backend creation error
    #[error("failed to create backend '{name}': {message}")]
    BackendCreation { name: String, message: String },

    /// Contract error (config loading)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a backend creation error
    pub fn backend_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// One backend spent its whole retry budget
#[derive(Debug, Clone, Error)]
#[error("backend '{backend}' exhausted after {attempts} attempt(s)")]
pub struct BackendExhausted {
    pub backend: String,
    pub attempts: u32,
    #[source]
    pub source: BackendError,
}

/// Failure of a whole failover sequence
#[derive(Debug, Clone, Error)]
pub enum FailoverError {
    /// Every backend exhausted its retries; carries the last one
    #[error("all backends exhausted after {attempts} attempt(s)")]
    AllBackendsExhausted {
        attempts: u32,
        #[source]
        last: BackendExhausted,
    },

    /// Sequencer has nothing to try
    #[error("no delivery backend configured")]
    NoBackends,
}

/// Errors surfaced to `send` callers
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every configured backend exhausted its retries
    #[error("message '{message_id}': all backends exhausted after {attempts} attempt(s)")]
    AllBackendsExhausted {
        message_id: MessageId,
        attempts: u32,
        #[source]
        source: BackendExhausted,
    },

    /// No backend to deliver through
    #[error("message '{message_id}': no delivery backend configured")]
    NoBackends { message_id: MessageId },

    /// Dispatcher is shutting down or gone
    #[error("dispatcher is shut down")]
    ShutDown,
}

impl DispatchError {
    /// The backend error that ended the last failover step, if any
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::AllBackendsExhausted { source, .. } => Some(&source.source),
            Self::NoBackends { .. } | Self::ShutDown => None,
        }
    }
}
