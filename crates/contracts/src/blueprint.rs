//! DispatchBlueprint - Config Loader output
//!
//! Describes a complete dispatcher setup: retry / rate-limit settings and the
//! ordered backend list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatcher configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Retry and rate-limit settings
    #[serde(default)]
    #[validate(nested)]
    pub dispatcher: DispatcherSettings,

    /// Backends in preference order
    #[validate(length(min = 1, message = "at least one backend is required"), nested)]
    pub backends: Vec<BackendConfig>,
}

/// Retry and rate-limit settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatcherSettings {
    /// Attempts per backend before failing over
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1, max = 32))]
    pub max_attempts: u32,

    /// Backoff base; the delay after failed attempt `n` is `base * 2^n`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Rate window: one immediate send per window, the rest are queued.
    /// 0 disables rate limiting.
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,

    /// Capacity of the dispatcher command channel
    #[serde(default = "default_command_buffer")]
    #[validate(range(min = 1))]
    pub command_buffer: usize,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_rate_window_ms() -> u64 {
    60_000
}

fn default_command_buffer() -> usize {
    256
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            rate_window_ms: default_rate_window_ms(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl DispatcherSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BackendConfig {
    /// Unique backend name
    #[validate(length(min = 1, message = "backend name cannot be empty"))]
    pub name: String,

    /// Backend type
    pub backend_type: BackendType,

    /// Backend-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Built-in backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Logs the message and always succeeds
    Log,
    /// Appends messages to a JSON-lines spool file
    File,
    /// Succeeds with a configured probability
    Simulated,
}

impl BackendType {
    /// Parameter keys understood by this backend type
    pub fn known_params(&self) -> &'static [&'static str] {
        match self {
            Self::Log => &[],
            Self::File => &["dir"],
            Self::Simulated => &["success_rate"],
        }
    }
}
