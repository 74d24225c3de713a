//! Send run statistics and per-message results.

use std::time::Duration;

use contracts::{DispatchOutcome, OutcomeStatus};
use dispatcher::{DispatchError, MetricsSnapshot};
use observability::OutcomeSummary;
use serde::Serialize;

/// What `send` returned for one message
#[derive(Debug, Clone, Serialize)]
pub struct SendRecord {
    pub message_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendRecord {
    pub fn from_result(
        fallback_id: &str,
        result: &Result<DispatchOutcome, DispatchError>,
    ) -> Self {
        match result {
            Ok(outcome) => {
                let error = match &outcome.status {
                    OutcomeStatus::Failed { error, .. } => Some(error.clone()),
                    _ => None,
                };
                Self {
                    message_id: outcome.message_id.to_string(),
                    status: outcome.status_label().to_string(),
                    backend: outcome.backend().map(str::to_string),
                    attempts: outcome.attempts(),
                    error,
                }
            }
            Err(DispatchError::AllBackendsExhausted {
                message_id,
                attempts,
                source,
            }) => Self {
                message_id: message_id.to_string(),
                status: "failed".to_string(),
                backend: None,
                attempts: Some(*attempts),
                error: Some(format!("{source}: {}", source.source)),
            },
            Err(e) => Self {
                message_id: fallback_id.to_string(),
                status: "error".to_string(),
                backend: None,
                attempts: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Statistics from a send run
#[derive(Debug, Clone, Default)]
pub struct SendStats {
    /// Immediate answer per message, in input order
    pub records: Vec<SendRecord>,

    /// Terminal outcomes seen by the reporter, drained messages included
    pub outcomes: OutcomeSummary,

    /// Dispatcher counters after shutdown
    pub counters: MetricsSnapshot,

    /// Wall time from first send to shutdown
    pub duration: Duration,

    /// Shutdown did not finish within the timeout
    pub timed_out: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    messages: &'a [SendRecord],
    delivered: u64,
    failed: u64,
    duplicates: u64,
    queued: u64,
    drained: u64,
    backend_attempts: u64,
    success_rate: f64,
    duration_secs: f64,
    timed_out: bool,
}

impl SendStats {
    /// Messages whose final outcome is unknown or failed
    pub fn has_failures(&self) -> bool {
        self.timed_out || self.counters.failed > 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonReport {
            messages: &self.records,
            delivered: self.counters.delivered,
            failed: self.counters.failed,
            duplicates: self.counters.duplicates,
            queued: self.counters.queued,
            drained: self.counters.drained,
            backend_attempts: self.counters.attempts,
            success_rate: self.outcomes.success_rate,
            duration_secs: self.duration.as_secs_f64(),
            timed_out: self.timed_out,
        })
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Dispatch Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📨 Messages");
        for record in &self.records {
            let detail = match (&record.backend, &record.error) {
                (Some(backend), _) => format!("via {backend}"),
                (None, Some(error)) => error.clone(),
                (None, None) => String::new(),
            };
            println!(
                "   ├─ {} [{}] {}",
                record.message_id, record.status, detail
            );
        }
        println!("   └─ {} total", self.records.len());

        println!("\n📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Delivered: {}", self.counters.delivered);
        println!("   ├─ Failed: {}", self.counters.failed);
        println!("   ├─ Duplicates: {}", self.counters.duplicates);
        println!(
            "   ├─ Queued: {} (drained {})",
            self.counters.queued, self.counters.drained
        );
        println!("   └─ Backend attempts: {}", self.counters.attempts);

        print!("\n{}", self.outcomes);

        if self.timed_out {
            println!("\n⚠️  Shutdown timed out; queued messages were abandoned");
        }
        println!();
    }
}
