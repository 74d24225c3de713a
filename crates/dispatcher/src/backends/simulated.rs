//! SimulatedBackend - stand-in provider that fails at random

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use contracts::{BackendError, DeliveryBackend, DeliveryReceipt, Message};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use crate::error::DispatcherError;

/// Default probability that an attempt succeeds
pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;

/// Backend that accepts a message with probability `success_rate`
///
/// Failures are transient, like a flaky upstream provider.
pub struct SimulatedBackend {
    name: String,
    success_rate: f64,
    rng: Mutex<StdRng>,
    accepted: AtomicU64,
}

impl SimulatedBackend {
    /// `success_rate` is clamped to `[0, 1]`
    pub fn new(name: impl Into<String>, success_rate: f64) -> Self {
        Self::with_rng(name, success_rate, StdRng::from_os_rng())
    }

    /// Deterministic variant for tests and reproducible runs
    pub fn seeded(name: impl Into<String>, success_rate: f64, seed: u64) -> Self {
        Self::with_rng(name, success_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(name: impl Into<String>, success_rate: f64, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            success_rate: success_rate.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
            accepted: AtomicU64::new(0),
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let success_rate = match params.get("success_rate") {
            Some(raw) => raw.parse::<f64>().map_err(|e| {
                DispatcherError::backend_creation(name, format!("invalid success_rate: {e}"))
            })?,
            None => DEFAULT_SUCCESS_RATE,
        };
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(DispatcherError::backend_creation(
                name,
                "success_rate must be within [0, 1]",
            ));
        }
        Ok(Self::new(name, success_rate))
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    fn roll(&self) -> bool {
        match self.rng.lock() {
            Ok(mut rng) => rng.random_bool(self.success_rate),
            Err(poisoned) => poisoned.into_inner().random_bool(self.success_rate),
        }
    }
}

impl DeliveryBackend for SimulatedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "simulated_backend_attempt",
        skip(self, message),
        fields(backend = %self.name)
    )]
    async fn attempt(&self, message: &Message) -> Result<DeliveryReceipt, BackendError> {
        if !self.roll() {
            debug!(to = %message.to(), "Simulated provider failure");
            return Err(BackendError::transient(&self.name, "simulated provider failure"));
        }

        let seq = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(DeliveryReceipt::new(&self.name).with_reference(format!("{}-{seq}", self.name)))
    }
}
