//! Dispatch 指标收集模块
//!
//! 基于 DispatchOutcome 收集和统计分发器的运行指标。

use std::collections::BTreeMap;
use std::sync::Mutex;

use contracts::{DispatchOutcome, OutcomeReporter, OutcomeStatus};
use metrics::{counter, gauge, histogram};

/// 从 DispatchOutcome 记录指标
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_outcome;
///
/// let outcome = dispatcher.send(message).await?;
/// record_outcome(&outcome);
/// ```
pub fn record_outcome(outcome: &DispatchOutcome) {
    counter!(
        "courier_messages_total",
        "status" => outcome.status_label()
    )
    .increment(1);

    match &outcome.status {
        OutcomeStatus::Delivered {
            backend, attempts, ..
        } => {
            counter!("courier_delivered_total", "backend" => backend.clone()).increment(1);
            histogram!("courier_dispatch_attempts").record(f64::from(*attempts));
        }
        OutcomeStatus::Failed { attempts, .. } => {
            histogram!("courier_dispatch_attempts").record(f64::from(*attempts));
        }
        OutcomeStatus::Queued { position } => {
            histogram!("courier_queue_position").record(*position as f64);
        }
        OutcomeStatus::Duplicate => {}
    }
}

/// 记录待发送队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("courier_queue_depth").set(depth as f64);
}

/// 记录端到端发送延迟 (从 send 调用到拿到结果)
pub fn record_send_latency_ms(latency_ms: f64) {
    histogram!("courier_send_latency_ms").record(latency_ms);
}

/// 分发结果聚合器
///
/// 在内存中聚合结果，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct OutcomeAggregator {
    /// 收到的结果总数
    pub total: u64,

    pub delivered: u64,

    pub failed: u64,

    pub duplicates: u64,

    pub queued: u64,

    /// 投递尝试次数统计 (仅 terminal 结果)
    pub attempt_stats: RunningStats,

    /// 各 backend 成功投递次数
    pub backend_counts: BTreeMap<String, u64>,

    /// 失败原因计数
    pub failure_reasons: BTreeMap<String, u64>,
}

impl OutcomeAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, outcome: &DispatchOutcome) {
        self.total += 1;

        match &outcome.status {
            OutcomeStatus::Delivered {
                backend, attempts, ..
            } => {
                self.delivered += 1;
                self.attempt_stats.push(f64::from(*attempts));
                *self.backend_counts.entry(backend.clone()).or_insert(0) += 1;
            }
            OutcomeStatus::Failed { error, attempts } => {
                self.failed += 1;
                self.attempt_stats.push(f64::from(*attempts));
                *self.failure_reasons.entry(error.clone()).or_insert(0) += 1;
            }
            OutcomeStatus::Duplicate => self.duplicates += 1,
            OutcomeStatus::Queued { .. } => self.queued += 1,
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> OutcomeSummary {
        let settled = self.delivered + self.failed;
        OutcomeSummary {
            total: self.total,
            delivered: self.delivered,
            failed: self.failed,
            duplicates: self.duplicates,
            queued: self.queued,
            success_rate: if settled > 0 {
                self.delivered as f64 / settled as f64 * 100.0
            } else {
                0.0
            },
            attempts: StatsSummary::from(&self.attempt_stats),
            backend_counts: self.backend_counts.clone(),
            failure_reasons: self.failure_reasons.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 结果摘要
#[derive(Debug, Clone, Default)]
pub struct OutcomeSummary {
    pub total: u64,
    pub delivered: u64,
    pub failed: u64,
    pub duplicates: u64,
    pub queued: u64,
    /// delivered / (delivered + failed), 百分比
    pub success_rate: f64,
    pub attempts: StatsSummary,
    pub backend_counts: BTreeMap<String, u64>,
    pub failure_reasons: BTreeMap<String, u64>,
}

impl std::fmt::Display for OutcomeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Outcomes: {}", self.total)?;
        writeln!(
            f,
            "Delivered: {} ({:.2}%)",
            self.delivered, self.success_rate
        )?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Duplicates: {}", self.duplicates)?;
        writeln!(f, "Queued: {}", self.queued)?;
        writeln!(f, "Attempts per message: {}", self.attempts)?;

        if !self.backend_counts.is_empty() {
            writeln!(f, "Delivered by backend:")?;
            for (backend, count) in &self.backend_counts {
                writeln!(f, "  {}: {}", backend, count)?;
            }
        }

        if !self.failure_reasons.is_empty() {
            writeln!(f, "Failure reasons:")?;
            for (reason, count) in &self.failure_reasons {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// OutcomeReporter: 记录 Prometheus 指标并在内存中聚合
#[derive(Debug, Default)]
pub struct MetricsReporter {
    aggregator: Mutex<OutcomeAggregator>,
}

impl MetricsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前聚合摘要
    pub fn summary(&self) -> OutcomeSummary {
        match self.aggregator.lock() {
            Ok(aggregator) => aggregator.summary(),
            Err(poisoned) => poisoned.into_inner().summary(),
        }
    }
}

impl OutcomeReporter for MetricsReporter {
    fn report(&self, outcome: &DispatchOutcome) {
        record_outcome(outcome);
        match self.aggregator.lock() {
            Ok(mut aggregator) => aggregator.update(outcome),
            Err(poisoned) => poisoned.into_inner().update(outcome),
        }
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DeliveryReceipt, MessageId};

    fn delivered(id: &str, backend: &str, attempts: u32) -> DispatchOutcome {
        DispatchOutcome::delivered(MessageId::new(id), DeliveryReceipt::new(backend), attempts)
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for attempts in [1.0, 1.0, 3.0, 5.0] {
            stats.push(attempts);
        }

        assert_eq!(stats.count(), 4);
        assert!((stats.mean() - 2.5).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 11.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = OutcomeAggregator::new();

        aggregator.update(&delivered("a", "primary", 1));
        aggregator.update(&delivered("b", "fallback", 6));
        aggregator.update(&DispatchOutcome::failed(MessageId::new("c"), "exhausted", 10));
        aggregator.update(&DispatchOutcome::duplicate(MessageId::new("a")));
        aggregator.update(&DispatchOutcome::queued(MessageId::new("d"), 1));

        assert_eq!(aggregator.total, 5);
        assert_eq!(aggregator.delivered, 2);
        assert_eq!(aggregator.failed, 1);
        assert_eq!(aggregator.duplicates, 1);
        assert_eq!(aggregator.queued, 1);
        assert_eq!(aggregator.backend_counts.get("fallback"), Some(&1));
        assert_eq!(aggregator.failure_reasons.get("exhausted"), Some(&1));
        assert_eq!(aggregator.attempt_stats.count(), 3);

        let summary = aggregator.summary();
        assert!((summary.success_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = OutcomeAggregator::new();
        aggregator.update(&delivered("a", "primary", 1));
        aggregator.update(&DispatchOutcome::failed(MessageId::new("b"), "exhausted", 5));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Outcomes: 2"));
        assert!(output.contains("Delivered: 1 (50.00%)"));
        assert!(output.contains("  primary: 1"));
        assert!(output.contains("  exhausted: 1"));
    }

    #[test]
    fn test_metrics_reporter_aggregates() {
        // No recorder installed: facade calls are no-ops
        let reporter = MetricsReporter::new();
        reporter.report(&delivered("a", "primary", 2));
        reporter.report(&delivered("b", "primary", 1));

        let summary = reporter.summary();
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.attempts.count, 2);
        assert!((summary.attempts.mean - 1.5).abs() < 1e-10);
    }
}
