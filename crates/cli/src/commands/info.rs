//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::DispatchBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    dispatcher: DispatcherInfo,
    backends: Vec<BackendInfo>,
}

#[derive(Serialize)]
struct DispatcherInfo {
    max_attempts: u32,
    base_delay_ms: u64,
    rate_window_ms: u64,
    command_buffer: usize,
    /// Delay before each retry, in milliseconds
    backoff_schedule_ms: Vec<u64>,
}

#[derive(Serialize)]
struct BackendInfo {
    name: String,
    backend_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn backoff_schedule_ms(blueprint: &DispatchBlueprint) -> Vec<u64> {
    let base = blueprint.dispatcher.base_delay();
    (1..blueprint.dispatcher.max_attempts)
        .map(|failures| dispatcher::backoff_delay(base, failures).as_millis() as u64)
        .collect()
}

fn build_config_info(blueprint: &DispatchBlueprint, args: &InfoArgs) -> ConfigInfo {
    let settings = &blueprint.dispatcher;

    let backends = blueprint
        .backends
        .iter()
        .map(|b| BackendInfo {
            name: b.name.clone(),
            backend_type: format!("{:?}", b.backend_type),
            params: if args.params {
                b.params.clone().into_iter().collect()
            } else {
                BTreeMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        dispatcher: DispatcherInfo {
            max_attempts: settings.max_attempts,
            base_delay_ms: settings.base_delay_ms,
            rate_window_ms: settings.rate_window_ms,
            command_buffer: settings.command_buffer,
            backoff_schedule_ms: backoff_schedule_ms(blueprint),
        },
        backends,
    }
}

fn print_config_info(blueprint: &DispatchBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Courier Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let settings = &blueprint.dispatcher;
    println!("⚙️  Dispatcher");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Max attempts per backend: {}", settings.max_attempts);
    println!("   ├─ Base delay: {}ms", settings.base_delay_ms);
    println!("   ├─ Backoff schedule (ms): {:?}", backoff_schedule_ms(blueprint));
    if settings.rate_window_ms == 0 {
        println!("   ├─ Rate window: disabled");
    } else {
        println!("   ├─ Rate window: {}ms", settings.rate_window_ms);
    }
    println!("   └─ Command buffer: {}", settings.command_buffer);

    println!("\n📤 Backends ({}, in failover order)", blueprint.backends.len());
    for (i, backend) in blueprint.backends.iter().enumerate() {
        let is_last = i == blueprint.backends.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({:?})", prefix, backend.name, backend.backend_type);

        if args.params {
            let params: BTreeMap<_, _> = backend.params.iter().collect();
            for (j, (key, value)) in params.iter().enumerate() {
                let param_prefix = if j == params.len() - 1 { "└─" } else { "├─" };
                println!("   {}  {} {} = {}", child_prefix, param_prefix, key, value);
            }
        }
    }

    println!();
}
