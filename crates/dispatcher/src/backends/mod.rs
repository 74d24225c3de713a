//! Built-in backend implementations
//!
//! Contains LogBackend, FileBackend, and SimulatedBackend. None of them
//! touch the network.

mod file;
mod log;
mod simulated;

use std::sync::Arc;

use contracts::{BackendConfig, BackendType};
use tracing::instrument;

use crate::backend::SharedBackend;
use crate::error::DispatcherError;

pub use self::file::FileBackend;
pub use self::log::LogBackend;
pub use self::simulated::SimulatedBackend;

/// Create a backend from configuration
#[instrument(
    name = "dispatcher_create_backend",
    skip(config),
    fields(backend = %config.name, backend_type = ?config.backend_type)
)]
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn SharedBackend>, DispatcherError> {
    match config.backend_type {
        BackendType::Log => Ok(Arc::new(LogBackend::new(&config.name))),
        BackendType::File => {
            let backend = FileBackend::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::backend_creation(&config.name, e.to_string()))?;
            Ok(Arc::new(backend))
        }
        BackendType::Simulated => {
            let backend = SimulatedBackend::from_params(&config.name, &config.params)?;
            Ok(Arc::new(backend))
        }
    }
}
