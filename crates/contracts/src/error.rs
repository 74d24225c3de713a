//! Errors raised while turning config text into a `DispatchBlueprint`

use thiserror::Error;

/// Why a dispatcher blueprint could not be loaded
#[derive(Debug, Error)]
pub enum ContractError {
    /// Config text is not valid TOML / JSON for a blueprint
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Blueprint decoded but breaks a dispatcher rule; `field` is the
    /// dotted path, e.g. `backends[1].name`
    #[error("invalid blueprint at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Config file could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field path for validation failures
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ConfigValidation { field, .. } => Some(field),
            _ => None,
        }
    }
}
