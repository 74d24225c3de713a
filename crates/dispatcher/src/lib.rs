//! # Dispatcher
//!
//! 消息分发模块。
//!
//! 负责：
//! - 按消息标识去重，同一标识最多投递一次
//! - 单个 backend 指数退避重试，耗尽后按顺序 failover
//! - 全局发送速率限制，超出部分排队，窗口重开后按 FIFO 排出
//!
//! All mutable dispatch state lives in one worker task; callers talk to it
//! through a cloneable [`DispatcherHandle`].

pub mod backend;
pub mod backends;
pub mod dispatcher;
pub mod error;
pub mod failover;
pub mod guard;
pub mod handle;
pub mod metrics;
pub mod rate_limiter;
pub mod reporter;
pub mod retry;

pub use backend::{BackendChain, SharedBackend};
pub use backends::{create_backend, FileBackend, LogBackend, SimulatedBackend};
pub use contracts::{DeliveryBackend, DispatchOutcome, Message, MessageId, OutcomeReporter};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::{BackendExhausted, DispatchError, DispatcherError, FailoverError};
pub use failover::{Delivery, FailoverSequencer};
pub use guard::IdempotencyGuard;
pub use handle::{DispatcherHandle, ShutdownMode, ABANDONED_ERROR};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use rate_limiter::{PendingMessage, PendingQueue, RateLimiter};
pub use reporter::{report_outcome, FanoutReporter, TracingReporter};
pub use retry::{backoff_delay, Attempted, RetryExecutor};
