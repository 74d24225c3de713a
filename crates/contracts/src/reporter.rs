//! OutcomeReporter - observability side channel

use crate::DispatchOutcome;

/// Receives every terminal dispatch outcome, keyed by message identity
///
/// Implementations must not assume they can influence dispatch: the
/// dispatcher ignores whatever happens inside `report`, panics included.
pub trait OutcomeReporter: Send + Sync {
    fn report(&self, outcome: &DispatchOutcome);
}

impl<F> OutcomeReporter for F
where
    F: Fn(&DispatchOutcome) + Send + Sync,
{
    fn report(&self, outcome: &DispatchOutcome) {
        self(outcome)
    }
}
