//! RateLimiter + PendingQueue - one send per window, overflow waits in FIFO

use std::collections::VecDeque;
use std::time::Duration;

use contracts::{Message, MessageId};
use tokio::time::Instant;

/// Send-window state
///
/// `mark_send` closes the window and hands back the instant the caller must
/// arm a drain timer for; `reopen` is called when that timer fires. The
/// limiter never arms timers itself, so "limited" holds exactly while the
/// owner has a timer outstanding.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    last_send: Option<Instant>,
    limited: bool,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_send: None,
            limited: false,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Zero window disables limiting
    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    pub fn is_limited(&self) -> bool {
        self.limited
    }

    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }

    /// Record a send at `now`
    ///
    /// Any send made while the window is open closes it for a full
    /// `window`, however long ago the previous send was: one send per
    /// window, and the window starts at the send. `last_send` is kept for
    /// diagnostics only and never gates admission.
    ///
    /// Returns `Some(reopen_at)` when this send closed the window and a drain
    /// timer must be armed. Returns `None` when limiting is disabled or the
    /// window was already closed.
    pub fn mark_send(&mut self, now: Instant) -> Option<Instant> {
        self.last_send = Some(now);
        if !self.is_enabled() || self.limited {
            return None;
        }
        self.limited = true;
        Some(now + self.window)
    }

    /// Drain timer fired; the window is open again
    pub fn reopen(&mut self) {
        self.limited = false;
    }
}

/// Message admitted while the window was closed
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub id: MessageId,
    pub message: Message,
    pub enqueued_at: Instant,
}

/// FIFO of admitted messages waiting for the window to reopen
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<PendingMessage>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the 1-based queue position
    pub fn push(&mut self, id: MessageId, message: Message) -> usize {
        self.entries.push_back(PendingMessage {
            id,
            message,
            enqueued_at: Instant::now(),
        });
        self.entries.len()
    }

    pub fn pop(&mut self) -> Option<PendingMessage> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry in FIFO order
    pub fn drain(&mut self) -> impl Iterator<Item = PendingMessage> + '_ {
        self.entries.drain(..)
    }
}
