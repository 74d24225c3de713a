//! `validate` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{BackendType, DispatchBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Worst-case backoff per backend above which a warning is emitted
const LONG_BACKOFF: Duration = Duration::from_secs(3600);

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    backend_count: usize,
    max_attempts: u32,
    base_delay_ms: u64,
    rate_window_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    backend_count: blueprint.backends.len(),
                    max_attempts: blueprint.dispatcher.max_attempts,
                    base_delay_ms: blueprint.dispatcher.base_delay_ms,
                    rate_window_ms: blueprint.dispatcher.rate_window_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Total sleep one backend can spend before failing over
fn worst_case_backoff(blueprint: &DispatchBlueprint) -> Duration {
    let base = blueprint.dispatcher.base_delay();
    (1..blueprint.dispatcher.max_attempts)
        .map(|failures| dispatcher::backoff_delay(base, failures))
        .fold(Duration::ZERO, Duration::saturating_add)
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DispatchBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.backends.len() == 1 {
        warnings.push("Only one backend configured - no failover is possible".to_string());
    }

    if blueprint.dispatcher.rate_window_ms == 0 {
        warnings.push("rate_window_ms is 0 - rate limiting is disabled".to_string());
    }

    let backoff = worst_case_backoff(blueprint);
    if backoff > LONG_BACKOFF {
        warnings.push(format!(
            "Worst-case backoff per backend is {}s - consider fewer attempts or a smaller base delay",
            backoff.as_secs()
        ));
    }

    for backend in &blueprint.backends {
        if backend.backend_type == BackendType::Simulated
            && backend.params.get("success_rate").map(String::as_str) == Some("0")
        {
            warnings.push(format!("Backend '{}' never succeeds", backend.name));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Backends: {}", summary.backend_count);
            println!("  Max attempts: {}", summary.max_attempts);
            println!("  Base delay: {}ms", summary.base_delay_ms);
            println!("  Rate window: {}ms", summary.rate_window_ms);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
