//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置加载 -> 分发器 -> backend 的 e2e 测试

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatchOutcome, MessageId};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_outcome_wire_format() {
        let outcome = DispatchOutcome::queued(MessageId::new("m-1"), 3);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["message_id"], "m-1");
        assert_eq!(value["status"]["kind"], "queued");
        assert_eq!(value["status"]["position"], 3);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        BackendError, DeliveryBackend, DeliveryReceipt, DispatchOutcome, Message, OutcomeStatus,
    };
    use dispatcher::{
        create_dispatcher, Dispatcher, DispatcherConfig, FanoutReporter, ShutdownMode,
        ABANDONED_ERROR,
    };
    use observability::MetricsReporter;
    use tokio::time;

    /// Provider that is down for the first `outage` attempts
    struct FlakyProvider {
        name: String,
        outage: u32,
        calls: Arc<AtomicU32>,
    }

    impl DeliveryBackend for FlakyProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn attempt(&self, _message: &Message) -> Result<DeliveryReceipt, BackendError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.outage {
                return Err(BackendError::transient(&self.name, "connection refused"));
            }
            Ok(DeliveryReceipt::new(&self.name).with_reference(format!("queue-{call}")))
        }
    }

    /// Provider that rejects every recipient outright
    struct RejectingProvider;

    impl DeliveryBackend for RejectingProvider {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn attempt(&self, _message: &Message) -> Result<DeliveryReceipt, BackendError> {
            Err(BackendError::permanent("rejecting", "recipient rejected"))
        }
    }

    fn email(id: &str) -> Message {
        Message::new("recipient@example.com", "Test Email", "This is a test email")
            .with_from("sender@example.com")
            .with_id(id)
    }

    /// End-to-end test: TOML blueprint -> ConfigLoader -> Dispatcher -> file spool
    #[tokio::test]
    async fn test_e2e_blueprint_to_file_spool() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
[dispatcher]
max_attempts = 3
base_delay_ms = 10
rate_window_ms = 0

[[backends]]
name = "spool"
backend_type = "file"
params = {{ dir = "{}" }}

[[backends]]
name = "console"
backend_type = "log"
"#,
            dir.path().display()
        );
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let reporter = Arc::new(MetricsReporter::new());
        let dispatcher = create_dispatcher(&blueprint, reporter.clone()).unwrap();
        assert_eq!(dispatcher.backends(), &["spool".to_string(), "console".to_string()]);

        for id in ["m-1", "m-2", "m-1"] {
            dispatcher.send(email(id)).await.unwrap();
        }
        let counters = dispatcher.shutdown(ShutdownMode::Drain).await;

        assert_eq!(counters.delivered, 2);
        assert_eq!(counters.duplicates, 1);

        let spool = std::fs::read_to_string(dir.path().join("spool.jsonl")).unwrap();
        assert_eq!(spool.lines().count(), 2);

        let summary = reporter.summary();
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.backend_counts.get("spool"), Some(&2));
    }

    /// Failover across custom backends with the default retry schedule
    #[tokio::test(start_paused = true)]
    async fn test_e2e_failover_after_outage() {
        let primary_calls = Arc::new(AtomicU32::new(0));
        let fallback_calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::new(Mutex::new(Vec::<DispatchOutcome>::new()));
        let sink = Arc::clone(&seen);

        let dispatcher = Dispatcher::builder(DispatcherConfig {
            rate_window: Duration::ZERO,
            ..DispatcherConfig::default()
        })
        .backend(FlakyProvider {
            name: "primary".to_string(),
            outage: u32::MAX,
            calls: Arc::clone(&primary_calls),
        })
        .backend(FlakyProvider {
            name: "fallback".to_string(),
            outage: 2,
            calls: Arc::clone(&fallback_calls),
        })
        .reporter(move |outcome: &DispatchOutcome| sink.lock().unwrap().push(outcome.clone()))
        .build()
        .unwrap();

        let start = time::Instant::now();
        let outcome = dispatcher.send(email("unique-email-id")).await.unwrap();

        assert_eq!(outcome.backend(), Some("fallback"));
        assert_eq!(outcome.attempts(), Some(5 + 3));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 5);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 3);
        // primary: 2+4+8+16, fallback: 2+4
        assert_eq!(start.elapsed(), Duration::from_secs(36));

        dispatcher.shutdown(ShutdownMode::Drain).await;
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            &seen[0].status,
            OutcomeStatus::Delivered { reference: Some(r), .. } if r == "queue-2"
        ));
    }

    /// Permanent rejection skips straight to the next backend
    #[tokio::test(start_paused = true)]
    async fn test_e2e_permanent_failure_fails_over_at_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let dispatcher = Dispatcher::builder(DispatcherConfig {
            rate_window: Duration::ZERO,
            ..DispatcherConfig::default()
        })
        .backend(RejectingProvider)
        .backend(FlakyProvider {
            name: "fallback".to_string(),
            outage: 0,
            calls: Arc::clone(&calls),
        })
        .build()
        .unwrap();

        let start = time::Instant::now();
        let outcome = dispatcher.send(email("m-1")).await.unwrap();

        assert_eq!(outcome.backend(), Some("fallback"));
        assert_eq!(outcome.attempts(), Some(2));
        assert_eq!(start.elapsed(), Duration::ZERO);
        dispatcher.shutdown(ShutdownMode::Drain).await;
    }

    /// Rate-limited traffic: drain on graceful shutdown, abandon on immediate
    #[tokio::test(start_paused = true)]
    async fn test_e2e_rate_limited_shutdown_modes() {
        for mode in [ShutdownMode::Drain, ShutdownMode::Immediate] {
            let calls = Arc::new(AtomicU32::new(0));
            let metrics = Arc::new(MetricsReporter::new());
            let fanout = FanoutReporter::new().with_shared(metrics.clone());

            let dispatcher = Dispatcher::builder(DispatcherConfig {
                rate_window: Duration::from_secs(60),
                ..DispatcherConfig::default()
            })
            .backend(FlakyProvider {
                name: "provider".to_string(),
                outage: 0,
                calls: Arc::clone(&calls),
            })
            .reporter(fanout)
            .build()
            .unwrap();

            let handle = dispatcher.handle();
            let mut outcomes = Vec::new();
            for id in ["a", "b", "c"] {
                outcomes.push(handle.send(email(id)).await.unwrap());
            }
            assert!(outcomes[0].is_success());
            assert_eq!(outcomes[1].status, OutcomeStatus::Queued { position: 1 });
            assert_eq!(outcomes[2].status, OutcomeStatus::Queued { position: 2 });

            let counters = dispatcher.shutdown(mode).await;
            let summary = metrics.summary();

            match mode {
                ShutdownMode::Drain => {
                    assert_eq!(calls.load(Ordering::SeqCst), 3);
                    assert_eq!(counters.drained, 2);
                    assert_eq!(summary.delivered, 3);
                }
                ShutdownMode::Immediate => {
                    assert_eq!(calls.load(Ordering::SeqCst), 1);
                    assert_eq!(counters.failed, 2);
                    assert_eq!(summary.failure_reasons.get(ABANDONED_ERROR), Some(&2));
                }
            }
        }
    }

    /// Concurrent senders racing on one identity: exactly one delivery
    #[tokio::test]
    async fn test_e2e_concurrent_duplicates() {
        let calls = Arc::new(AtomicU32::new(0));
        let dispatcher = Dispatcher::builder(DispatcherConfig {
            rate_window: Duration::ZERO,
            ..DispatcherConfig::default()
        })
        .backend(FlakyProvider {
            name: "provider".to_string(),
            outage: 0,
            calls: Arc::clone(&calls),
        })
        .build()
        .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let handle = dispatcher.handle();
            tasks.push(tokio::spawn(async move { handle.send(email("same-id")).await }));
        }

        let mut delivered = 0;
        let mut duplicates = 0;
        for task in tasks {
            match task.await.unwrap().unwrap().status {
                OutcomeStatus::Delivered { .. } => delivered += 1,
                OutcomeStatus::Duplicate => duplicates += 1,
                other => panic!("unexpected status: {other:?}"),
            }
        }

        assert_eq!(delivered, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        dispatcher.shutdown(ShutdownMode::Drain).await;
    }
}
