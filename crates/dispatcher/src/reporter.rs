//! Built-in outcome reporters and panic-isolated reporting

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use contracts::{DispatchOutcome, OutcomeReporter, OutcomeStatus};
use tracing::{error, info, warn};

/// Logs every outcome through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl OutcomeReporter for TracingReporter {
    fn report(&self, outcome: &DispatchOutcome) {
        match &outcome.status {
            OutcomeStatus::Delivered {
                backend, attempts, ..
            } => info!(
                message_id = %outcome.message_id,
                backend = %backend,
                attempts,
                "Message delivered"
            ),
            OutcomeStatus::Failed { error, attempts } => warn!(
                message_id = %outcome.message_id,
                attempts,
                error = %error,
                "Message failed"
            ),
            status => info!(
                message_id = %outcome.message_id,
                status = ?status,
                "Message outcome"
            ),
        }
    }
}

/// Forwards each outcome to several reporters in order
#[derive(Default, Clone)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn OutcomeReporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: impl OutcomeReporter + 'static) -> Self {
        self.reporters.push(Arc::new(reporter));
        self
    }

    pub fn with_shared(mut self, reporter: Arc<dyn OutcomeReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl OutcomeReporter for FanoutReporter {
    fn report(&self, outcome: &DispatchOutcome) {
        for reporter in &self.reporters {
            report_outcome(reporter.as_ref(), outcome);
        }
    }
}

/// Hand `outcome` to `reporter`, containing any panic
///
/// A misbehaving reporter is logged and otherwise ignored.
pub fn report_outcome(reporter: &dyn OutcomeReporter, outcome: &DispatchOutcome) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| reporter.report(outcome)));
    if let Err(panic) = result {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(
            message_id = %outcome.message_id,
            panic = %reason,
            "Outcome reporter panicked"
        );
    }
}
