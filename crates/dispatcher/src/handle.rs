//! DispatcherHandle + worker - serialized admission, limiting and queueing

use std::sync::Arc;

use contracts::{DispatchOutcome, Message, MessageId, OutcomeReporter};
use ::metrics::gauge;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{DispatchError, FailoverError};
use crate::failover::FailoverSequencer;
use crate::guard::IdempotencyGuard;
use crate::metrics::DispatchMetrics;
use crate::rate_limiter::{PendingQueue, RateLimiter};
use crate::reporter::report_outcome;

/// Error recorded for queued messages dropped at shutdown
pub const ABANDONED_ERROR: &str = "dispatcher shut down before drain";

type Reply = oneshot::Sender<Result<DispatchOutcome, DispatchError>>;

/// How [`crate::Dispatcher::shutdown`] treats the pending queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownMode {
    /// Keep draining on schedule until the queue is empty
    #[default]
    Drain,
    /// Report queued messages as failed and stop
    Immediate,
}

pub(crate) enum Command {
    Send { message: Message, reply: Reply },
    /// Posted by the drain timer armed with the same generation
    Reopen { generation: u64 },
    Shutdown { mode: ShutdownMode },
}

/// Cloneable entry point for concurrent senders
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Command>,
    metrics: Arc<DispatchMetrics>,
}

impl DispatcherHandle {
    pub(crate) fn new(tx: mpsc::Sender<Command>, metrics: Arc<DispatchMetrics>) -> Self {
        Self { tx, metrics }
    }

    /// Dispatch `message`
    ///
    /// Resolves once the message is delivered, failed, rejected as a
    /// duplicate or queued behind the rate limiter.
    ///
    /// # Errors
    /// `AllBackendsExhausted` when every backend gave up, `ShutDown` when the
    /// dispatcher no longer accepts messages.
    pub async fn send(&self, message: Message) -> Result<DispatchOutcome, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Send { message, reply })
            .await
            .map_err(|_| DispatchError::ShutDown)?;
        rx.await.map_err(|_| DispatchError::ShutDown)?
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) async fn request_shutdown(&self, mode: ShutdownMode) -> bool {
        self.tx.send(Command::Shutdown { mode }).await.is_ok()
    }
}

/// Shared state cloned into every delivery task
#[derive(Clone)]
struct DeliveryContext {
    sequencer: Arc<FailoverSequencer>,
    reporter: Arc<dyn OutcomeReporter>,
    metrics: Arc<DispatchMetrics>,
}

/// Owner of the guard, limiter and queue
pub(crate) struct DispatchWorker {
    rx: mpsc::Receiver<Command>,
    /// Handed to drain timers; never keeps the channel open
    weak_tx: mpsc::WeakSender<Command>,
    guard: IdempotencyGuard,
    limiter: RateLimiter,
    queue: PendingQueue,
    ctx: DeliveryContext,
    deliveries: JoinSet<()>,
    drain_timer: Option<JoinHandle<()>>,
    timer_generation: u64,
    closing: bool,
    rx_closed: bool,
}

impl DispatchWorker {
    pub(crate) fn new(
        rx: mpsc::Receiver<Command>,
        weak_tx: mpsc::WeakSender<Command>,
        limiter: RateLimiter,
        sequencer: Arc<FailoverSequencer>,
        reporter: Arc<dyn OutcomeReporter>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            rx,
            weak_tx,
            guard: IdempotencyGuard::new(),
            limiter,
            queue: PendingQueue::new(),
            ctx: DeliveryContext {
                sequencer,
                reporter,
                metrics,
            },
            deliveries: JoinSet::new(),
            drain_timer: None,
            timer_generation: 0,
            closing: false,
            rx_closed: false,
        }
    }

    /// Run until shut down and every admitted message is settled
    #[instrument(name = "dispatch_worker_loop", skip(self))]
    pub(crate) async fn run(mut self) {
        debug!(
            backends = self.ctx.sequencer.backends().len(),
            window_ms = self.limiter.window().as_millis() as u64,
            "Dispatch worker started"
        );

        loop {
            if self.closing && self.queue.is_empty() && self.deliveries.is_empty() {
                break;
            }

            tokio::select! {
                command = self.rx.recv(), if !self.rx_closed => match command {
                    Some(command) => self.handle_command(command),
                    None => self.on_channel_closed(),
                },
                Some(joined) = self.deliveries.join_next() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Delivery task panicked");
                    }
                }
                else => break,
            }
        }

        if let Some(timer) = self.drain_timer.take() {
            timer.abort();
        }

        info!(
            admitted = self.guard.len(),
            delivered = self.ctx.metrics.delivered(),
            failed = self.ctx.metrics.failed(),
            "Dispatch worker stopped"
        );
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { message, reply } => self.accept(message, reply),
            Command::Reopen { generation } => self.reopen(generation),
            Command::Shutdown { mode } => self.begin_shutdown(mode),
        }
    }

    fn accept(&mut self, message: Message, reply: Reply) {
        if self.closing {
            let _ = reply.send(Err(DispatchError::ShutDown));
            return;
        }

        let (id, message) = message.into_identified();

        if !self.guard.admit(&id) {
            self.ctx.metrics.inc_duplicates();
            debug!(message_id = %id, "Duplicate message rejected");
            let _ = reply.send(Ok(DispatchOutcome::duplicate(id)));
            return;
        }
        self.ctx.metrics.inc_admitted();

        if self.limiter.is_limited() {
            let position = self.queue.push(id.clone(), message);
            self.ctx.metrics.inc_queued();
            self.sync_queue_len();
            debug!(message_id = %id, position, "Rate limited, message queued");
            let _ = reply.send(Ok(DispatchOutcome::queued(id, position)));
            return;
        }

        self.start_delivery(id, message, Some(reply));
    }

    /// Mark the send, arm a timer if the window just closed, spawn delivery
    fn start_delivery(&mut self, id: MessageId, message: Message, reply: Option<Reply>) {
        if let Some(reopen_at) = self.limiter.mark_send(Instant::now()) {
            self.arm_drain_timer(reopen_at);
        }

        let ctx = self.ctx.clone();
        self.deliveries
            .spawn(async move { deliver(ctx, id, message, reply).await });
    }

    fn arm_drain_timer(&mut self, reopen_at: Instant) {
        self.timer_generation += 1;
        let generation = self.timer_generation;
        let weak_tx = self.weak_tx.clone();

        if let Some(stale) = self.drain_timer.take() {
            stale.abort();
        }
        self.drain_timer = Some(tokio::spawn(async move {
            time::sleep_until(reopen_at).await;
            if let Some(tx) = weak_tx.upgrade() {
                let _ = tx.send(Command::Reopen { generation }).await;
            }
        }));
    }

    /// Window reopened: release queued messages in FIFO order
    ///
    /// Admission was granted at enqueue time, so drained messages go straight
    /// to the rate-limit step. Draining stops as soon as a send closes the
    /// window again.
    fn reopen(&mut self, generation: u64) {
        if generation != self.timer_generation {
            debug!(generation, "Ignoring stale reopen");
            return;
        }
        self.drain_timer = None;
        self.limiter.reopen();

        while !self.limiter.is_limited() {
            let Some(pending) = self.queue.pop() else {
                break;
            };
            self.ctx.metrics.inc_drained();
            debug!(
                message_id = %pending.id,
                waited_ms = pending.enqueued_at.elapsed().as_millis() as u64,
                remaining = self.queue.len(),
                "Draining queued message"
            );
            self.start_delivery(pending.id, pending.message, None);
        }

        self.sync_queue_len();
    }

    fn begin_shutdown(&mut self, mode: ShutdownMode) {
        info!(
            mode = ?mode,
            pending = self.queue.len(),
            in_flight = self.deliveries.len(),
            "Dispatcher shutting down"
        );
        self.closing = true;
        if mode == ShutdownMode::Immediate {
            self.abandon_queue();
        }
    }

    /// Every sender dropped without a shutdown request
    fn on_channel_closed(&mut self) {
        self.rx_closed = true;
        if !self.closing {
            info!(
                pending = self.queue.len(),
                "All dispatcher handles dropped, stopping"
            );
        }
        self.closing = true;
        self.abandon_queue();
    }

    /// Fail every queued message and disarm the drain timer
    fn abandon_queue(&mut self) {
        if let Some(timer) = self.drain_timer.take() {
            timer.abort();
        }
        // Invalidates a reopen the timer may already have posted
        self.timer_generation += 1;
        self.limiter.reopen();

        for pending in self.queue.drain() {
            self.ctx.metrics.inc_failed();
            warn!(message_id = %pending.id, "Queued message abandoned");
            report_outcome(
                self.ctx.reporter.as_ref(),
                &DispatchOutcome::failed(pending.id, ABANDONED_ERROR, 0),
            );
        }
        self.sync_queue_len();
    }

    fn sync_queue_len(&self) {
        let len = self.queue.len();
        self.ctx.metrics.set_queue_len(len);
        gauge!("courier_queue_depth").set(len as f64);
    }
}

/// Run the failover sequence for one admitted message and settle it
#[instrument(name = "dispatch_delivery", skip(ctx, message, reply), fields(message_id = %id))]
async fn deliver(ctx: DeliveryContext, id: MessageId, message: Message, reply: Option<Reply>) {
    let result = match ctx.sequencer.dispatch(&message).await {
        Ok(delivery) => {
            ctx.metrics.add_attempts(delivery.total_attempts);
            ctx.metrics.inc_delivered();
            let outcome = DispatchOutcome::delivered(id, delivery.receipt, delivery.total_attempts);
            report_outcome(ctx.reporter.as_ref(), &outcome);
            Ok(outcome)
        }
        Err(FailoverError::AllBackendsExhausted { attempts, last }) => {
            ctx.metrics.add_attempts(attempts);
            ctx.metrics.inc_failed();
            let outcome =
                DispatchOutcome::failed(id.clone(), format!("{last}: {}", last.source), attempts);
            report_outcome(ctx.reporter.as_ref(), &outcome);
            Err(DispatchError::AllBackendsExhausted {
                message_id: id,
                attempts,
                source: last,
            })
        }
        Err(FailoverError::NoBackends) => {
            ctx.metrics.inc_failed();
            let outcome = DispatchOutcome::failed(id.clone(), "no delivery backend configured", 0);
            report_outcome(ctx.reporter.as_ref(), &outcome);
            Err(DispatchError::NoBackends { message_id: id })
        }
    };

    if let Some(reply) = reply {
        // Caller may have given up waiting; the outcome is already reported
        let _ = reply.send(result);
    }
}
