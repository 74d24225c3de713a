//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (validator derive): max_attempts 1..=32, command_buffer >= 1
//! - 至少一个 backend, backend 名称非空且唯一
//! - backend params 只能包含该类型支持的键
//! - simulated backend 的 success_rate 在 [0, 1] 内

use std::collections::HashSet;

use contracts::{BackendConfig, BackendType, ContractError, DispatchBlueprint};
use ::validator::Validate;

/// 校验 DispatchBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_backend_names(blueprint)?;
    for backend in &blueprint.backends {
        validate_backend_params(backend)?;
    }
    Ok(())
}

/// 字段级校验 (derive 规则)
fn validate_fields(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|errors| ContractError::config_validation("blueprint", errors.to_string()))
}

/// 校验 backend 名称唯一性
fn validate_backend_names(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for backend in &blueprint.backends {
        if !seen.insert(backend.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("backends[name={}]", backend.name),
                "duplicate backend name",
            ));
        }
    }
    Ok(())
}

/// 校验 backend 参数
fn validate_backend_params(backend: &BackendConfig) -> Result<(), ContractError> {
    let known = backend.backend_type.known_params();
    if let Some(unknown) = backend.params.keys().find(|k| !known.contains(&k.as_str())) {
        return Err(ContractError::config_validation(
            format!("backends[{}].params.{}", backend.name, unknown),
            format!("unknown parameter for {:?} backend", backend.backend_type),
        ));
    }

    if backend.backend_type == BackendType::Simulated {
        if let Some(raw) = backend.params.get("success_rate") {
            let rate: f64 = raw.parse().map_err(|_| {
                ContractError::config_validation(
                    format!("backends[{}].params.success_rate", backend.name),
                    format!("success_rate must be a number, got '{raw}'"),
                )
            })?;
            if !(0.0..=1.0).contains(&rate) {
                return Err(ContractError::config_validation(
                    format!("backends[{}].params.success_rate", backend.name),
                    format!("success_rate must be within [0, 1], got {rate}"),
                ));
            }
        }
    }

    Ok(())
}
