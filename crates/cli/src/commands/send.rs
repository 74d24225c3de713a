//! `send` command implementation.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{DispatchBlueprint, Message, OutcomeReporter};
use dispatcher::{create_dispatcher, FanoutReporter, ShutdownMode, TracingReporter};
use observability::MetricsReporter;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cli::SendArgs;
use crate::report::{SendRecord, SendStats};

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    apply_overrides(&mut blueprint, args)?;

    let messages = load_messages(&args.messages)?;

    info!(
        backends = blueprint.backends.len(),
        messages = messages.len(),
        max_attempts = blueprint.dispatcher.max_attempts,
        rate_window_ms = blueprint.dispatcher.rate_window_ms,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration and messages are valid, exiting");
        println!(
            "Would send {} message(s) through {} backend(s)",
            messages.len(),
            blueprint.backends.len()
        );
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let shutdown_signal = setup_shutdown_signal();

    let stats = tokio::select! {
        result = dispatch_all(&blueprint, messages, args) => result?,
        _ = shutdown_signal => {
            warn!("Received shutdown signal, abandoning remaining messages");
            return Ok(());
        }
    };

    if args.json {
        println!(
            "{}",
            stats.to_json().context("Failed to serialize send report")?
        );
    } else {
        stats.print_summary();
    }

    if stats.has_failures() {
        anyhow::bail!(
            "{} message(s) failed{}",
            stats.counters.failed,
            if stats.timed_out { " (shutdown timed out)" } else { "" }
        );
    }

    info!("Courier finished");
    Ok(())
}

/// Apply CLI overrides and re-validate the result
fn apply_overrides(blueprint: &mut DispatchBlueprint, args: &SendArgs) -> Result<()> {
    if let Some(max_attempts) = args.max_attempts {
        info!(max_attempts, "Overriding max_attempts from CLI");
        blueprint.dispatcher.max_attempts = max_attempts;
    }
    if let Some(base_delay_ms) = args.base_delay_ms {
        info!(base_delay_ms, "Overriding base_delay_ms from CLI");
        blueprint.dispatcher.base_delay_ms = base_delay_ms;
    }
    if let Some(rate_window_ms) = args.rate_window_ms {
        info!(rate_window_ms, "Overriding rate_window_ms from CLI");
        blueprint.dispatcher.rate_window_ms = rate_window_ms;
    }

    config_loader::ConfigLoader::validate(blueprint).context("Invalid configuration overrides")
}

/// Read a JSON array of messages
fn load_messages(path: &Path) -> Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read messages from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse messages in {}", path.display()))
}

/// Send every message concurrently, then shut the dispatcher down
async fn dispatch_all(
    blueprint: &DispatchBlueprint,
    messages: Vec<Message>,
    args: &SendArgs,
) -> Result<SendStats> {
    let metrics_reporter = Arc::new(MetricsReporter::new());
    let reporter = FanoutReporter::new()
        .with(TracingReporter)
        .with_shared(Arc::clone(&metrics_reporter) as Arc<dyn OutcomeReporter>);

    let dispatcher = create_dispatcher(blueprint, Arc::new(reporter))
        .context("Failed to create dispatcher")?;

    let started = Instant::now();
    let mut sends = JoinSet::new();
    for (index, message) in messages.into_iter().enumerate() {
        let handle = dispatcher.handle();
        sends.spawn(async move { (index, handle.send(message).await) });
    }

    let mut records = Vec::with_capacity(sends.len());
    while let Some(joined) = sends.join_next().await {
        let (index, result) = joined.context("Send task panicked")?;
        let record = SendRecord::from_result(&format!("#{index}"), &result);
        // Immediate answers (duplicate / queued) never reach the reporter
        if let Ok(outcome) = &result {
            if !outcome.is_terminal() {
                metrics_reporter.report(outcome);
            }
        }
        records.push((index, record));
    }
    records.sort_by_key(|(index, _)| *index);

    let mode = if args.no_drain {
        ShutdownMode::Immediate
    } else {
        ShutdownMode::Drain
    };
    let pending = dispatcher.metrics().queue_len;
    if pending > 0 && mode == ShutdownMode::Drain {
        info!(pending, "Waiting for rate-limited messages to drain");
    }

    let (counters, timed_out) = if args.timeout == 0 {
        (dispatcher.shutdown(mode).await, false)
    } else {
        let handle = dispatcher.handle();
        match tokio::time::timeout(Duration::from_secs(args.timeout), dispatcher.shutdown(mode))
            .await
        {
            Ok(counters) => (counters, false),
            Err(_) => {
                warn!(timeout_secs = args.timeout, "Shutdown timed out");
                (handle.metrics().snapshot(), true)
            }
        }
    };

    Ok(SendStats {
        records: records.into_iter().map(|(_, record)| record).collect(),
        outcomes: metrics_reporter.summary(),
        counters,
        duration: started.elapsed(),
        timed_out,
    })
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
