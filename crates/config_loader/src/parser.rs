//! 配置文本 -> `DispatchBlueprint`
//!
//! 只负责反序列化；默认值由 contracts 中的 serde default 填充，
//! 业务规则由 `validator` 模块检查。

use contracts::{ContractError, DispatchBlueprint};

/// Blueprint source format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `toml` / `json`, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

pub fn parse_toml(content: &str) -> Result<DispatchBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| decode_error(ConfigFormat::Toml, e))
}

pub fn parse_json(content: &str) -> Result<DispatchBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| decode_error(ConfigFormat::Json, e))
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<DispatchBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

fn decode_error<E>(format: ConfigFormat, err: E) -> ContractError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ContractError::ConfigParse {
        message: format!("{} blueprint: {err}", format.label()),
        source: Some(Box::new(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BackendType;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[backends]]
name = "primary"
backend_type = "log"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.dispatcher.max_attempts, 5);
        assert_eq!(bp.dispatcher.rate_window_ms, 60_000);
        assert_eq!(bp.backends.len(), 1);
        assert_eq!(bp.backends[0].backend_type, BackendType::Log);
    }

    #[test]
    fn test_parse_json_with_params() {
        let content = r#"{
            "dispatcher": { "max_attempts": 3, "base_delay_ms": 250 },
            "backends": [
                { "name": "provider-a", "backend_type": "simulated", "params": { "success_rate": "0.8" } },
                { "name": "spool", "backend_type": "file", "params": { "dir": "/tmp/spool" } }
            ]
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.dispatcher.max_attempts, 3);
        assert_eq!(bp.dispatcher.base_delay_ms, 250);
        assert_eq!(bp.dispatcher.rate_window_ms, 60_000);
        assert_eq!(bp.backends[1].params.get("dir").map(String::as_str), Some("/tmp/spool"));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_backend_type() {
        let content = r#"
[[backends]]
name = "primary"
backend_type = "carrier_pigeon"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
