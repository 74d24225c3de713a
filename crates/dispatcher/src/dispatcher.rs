//! Dispatcher - public entry point wiring guard, limiter and failover

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use contracts::{
    DeliveryBackend, DispatchBlueprint, DispatchOutcome, DispatcherSettings, Message,
    OutcomeReporter,
};

use crate::backend::{BackendChain, SharedBackend};
use crate::backends::create_backend;
use crate::error::{DispatchError, DispatcherError};
use crate::failover::FailoverSequencer;
use crate::handle::{DispatchWorker, DispatcherHandle, ShutdownMode};
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::rate_limiter::RateLimiter;
use crate::reporter::TracingReporter;
use crate::retry::RetryExecutor;

/// Dispatcher configuration, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Attempts per backend before failing over
    pub max_attempts: u32,
    /// Backoff base; the n-th retry waits `base_delay * 2^n`
    pub base_delay: Duration,
    /// One immediate send per window; zero disables limiting
    pub rate_window: Duration,
    /// Capacity of the command channel between handles and the worker
    pub command_buffer: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from(&DispatcherSettings::default())
    }
}

impl From<&DispatcherSettings> for DispatcherConfig {
    fn from(settings: &DispatcherSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: settings.base_delay(),
            rate_window: settings.rate_window(),
            command_buffer: settings.command_buffer,
        }
    }
}

impl DispatcherConfig {
    fn validate(&self) -> Result<(), DispatcherError> {
        if self.max_attempts == 0 {
            return Err(DispatcherError::invalid_config(
                "max_attempts",
                "must be at least 1",
            ));
        }
        if self.command_buffer == 0 {
            return Err(DispatcherError::invalid_config(
                "command_buffer",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    backends: BackendChain,
    reporter: Option<Arc<dyn OutcomeReporter>>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            backends: BackendChain::new(),
            reporter: None,
        }
    }

    /// Append a backend; earlier backends are preferred
    pub fn backend<B>(mut self, backend: B) -> Self
    where
        B: DeliveryBackend + Sync + 'static,
    {
        self.backends.push(backend);
        self
    }

    pub fn shared_backend(mut self, backend: Arc<dyn SharedBackend>) -> Self {
        self.backends.push_shared(backend);
        self
    }

    /// Replace the backend chain
    pub fn backends(mut self, backends: BackendChain) -> Self {
        self.backends = backends;
        self
    }

    /// Observability hook; defaults to [`TracingReporter`]
    pub fn reporter(mut self, reporter: impl OutcomeReporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    pub fn shared_reporter(mut self, reporter: Arc<dyn OutcomeReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Validate and start the dispatcher worker
    ///
    /// Must be called inside a Tokio runtime.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(backends = self.backends.len())
    )]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let reporter = self
            .reporter
            .unwrap_or_else(|| Arc::new(TracingReporter));
        Dispatcher::spawn(self.config, self.backends, reporter)
    }
}

/// Resilient message dispatcher
///
/// Owns the worker task. Clone [`Dispatcher::handle`] for concurrent senders
/// and call [`Dispatcher::shutdown`] to stop.
pub struct Dispatcher {
    handle: DispatcherHandle,
    backends: Vec<String>,
    config: DispatcherConfig,
    worker: JoinHandle<()>,
}

impl Dispatcher {
    pub fn builder(config: DispatcherConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    /// Start the worker task on the current runtime
    ///
    /// # Errors
    /// `NoBackends` for an empty chain, `InvalidConfig` when `config` fails
    /// validation.
    pub fn spawn(
        config: DispatcherConfig,
        backends: BackendChain,
        reporter: Arc<dyn OutcomeReporter>,
    ) -> Result<Self, DispatcherError> {
        if backends.is_empty() {
            return Err(DispatcherError::NoBackends);
        }
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.command_buffer);
        let metrics = Arc::new(DispatchMetrics::new());
        let names = backends.names();

        let sequencer = Arc::new(FailoverSequencer::new(
            backends,
            RetryExecutor::new(config.max_attempts, config.base_delay),
        ));
        let worker = DispatchWorker::new(
            rx,
            tx.downgrade(),
            RateLimiter::new(config.rate_window),
            sequencer,
            reporter,
            Arc::clone(&metrics),
        );
        let worker = tokio::spawn(worker.run());

        info!(
            backends = ?names,
            max_attempts = config.max_attempts,
            base_delay_ms = config.base_delay.as_millis() as u64,
            rate_window_ms = config.rate_window.as_millis() as u64,
            "Dispatcher started"
        );

        Ok(Self {
            handle: DispatcherHandle::new(tx, metrics),
            backends: names,
            config,
            worker,
        })
    }

    /// Cloneable handle for concurrent senders
    pub fn handle(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    /// See [`DispatcherHandle::send`]
    pub async fn send(&self, message: Message) -> Result<DispatchOutcome, DispatchError> {
        self.handle.send(message).await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.handle.metrics().snapshot()
    }

    /// Backend names in preference order
    pub fn backends(&self) -> &[String] {
        &self.backends
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Stop accepting messages and wait for the worker to settle
    ///
    /// Returns once every admitted message has a terminal outcome.
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(self, mode: ShutdownMode) -> MetricsSnapshot {
        let Self { handle, worker, .. } = self;

        if !handle.request_shutdown(mode).await {
            debug!("Dispatcher worker already stopped");
        }
        // `handle` keeps the channel open so drain timers can still post
        if let Err(e) = worker.await {
            error!(error = ?e, "Dispatcher worker panicked");
        }

        let snapshot = handle.metrics().snapshot();
        info!(
            delivered = snapshot.delivered,
            failed = snapshot.failed,
            duplicates = snapshot.duplicates,
            "Dispatcher shutdown complete"
        );
        snapshot
    }
}

/// Convenience function to create a dispatcher from a blueprint
#[instrument(
    name = "dispatcher_create",
    skip(blueprint, reporter),
    fields(backends = blueprint.backends.len())
)]
pub fn create_dispatcher(
    blueprint: &DispatchBlueprint,
    reporter: Arc<dyn OutcomeReporter>,
) -> Result<Dispatcher, DispatcherError> {
    let mut backends = BackendChain::new();
    for backend_config in &blueprint.backends {
        backends.push_shared(create_backend(backend_config)?);
    }

    DispatcherBuilder::new(DispatcherConfig::from(&blueprint.dispatcher))
        .backends(backends)
        .shared_reporter(reporter)
        .build()
}
