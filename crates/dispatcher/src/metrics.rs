//! Dispatcher counters for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared between the dispatcher worker, deliveries and callers
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Current pending queue length
    queue_len: AtomicUsize,
    /// Messages that passed the idempotency guard
    admitted: AtomicU64,
    /// Messages rejected as duplicates
    duplicates: AtomicU64,
    /// Messages deferred by the rate limiter
    queued: AtomicU64,
    /// Queued messages later released by a drain
    drained: AtomicU64,
    /// Messages accepted by some backend
    delivered: AtomicU64,
    /// Messages that exhausted every backend or were abandoned
    failed: AtomicU64,
    /// Backend invocations across all deliveries
    attempts: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    pub fn inc_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn inc_duplicates(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn inc_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn drained(&self) -> u64 {
        self.drained.load(Ordering::Relaxed)
    }

    pub fn inc_drained(&self) {
        self.drained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn add_attempts(&self, n: u32) {
        self.attempts.fetch_add(u64::from(n), Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            admitted: self.admitted(),
            duplicates: self.duplicates(),
            queued: self.queued(),
            drained: self.drained(),
            delivered: self.delivered(),
            failed: self.failed(),
            attempts: self.attempts(),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub admitted: u64,
    pub duplicates: u64,
    pub queued: u64,
    pub drained: u64,
    pub delivered: u64,
    pub failed: u64,
    pub attempts: u64,
}

impl MetricsSnapshot {
    /// Admitted messages with no terminal outcome yet
    pub fn in_flight(&self) -> u64 {
        self.admitted
            .saturating_sub(self.delivered)
            .saturating_sub(self.failed)
    }
}
