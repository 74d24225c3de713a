//! # Config Loader
//!
//! Reads a courier config file into a validated [`DispatchBlueprint`]:
//! the `[dispatcher]` retry / rate-limit settings plus the ordered
//! `[[backends]]` failover chain.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("courier.toml")).unwrap();
//! println!("Failover chain: {} backend(s)", blueprint.backends.len());
//! ```

mod parser;
mod validator;

pub use contracts::DispatchBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry point for blueprint loading; stateless
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a blueprint from `.toml` or `.json`
    ///
    /// # Errors
    /// Unreadable file, unknown extension, malformed content, or a blueprint
    /// that fails validation (empty chain, duplicate backend names, ...).
    pub fn load_from_path(path: &Path) -> Result<DispatchBlueprint, ContractError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ConfigFormat::from_extension)
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "unsupported config format for {} (expected .toml or .json)",
                    path.display()
                ))
            })?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse then validate in-memory config text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatchBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint after CLI / env overrides were applied
    pub fn validate(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &DispatchBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("cannot render blueprint as TOML: {e}")))
    }

    pub fn to_json(blueprint: &DispatchBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("cannot render blueprint as JSON: {e}")))
    }
}
