use serde_json::{Map, Value};

use semantiva_processors::ProcessorMetadata;
use semantiva_types::Context;

use crate::error::{ConfigError, Result};

/// `resolveRuntimeValue` (§4.G): config wins, then context, then the processor's own default.
pub fn resolve_runtime_value(
    name: &str,
    processor: &ProcessorMetadata,
    processor_config: &Map<String, Value>,
    context: &Context,
) -> Result<Value> {
    if let Some(value) = processor_config.get(name) {
        return Ok(value.clone());
    }
    if let Some(value) = context.get(name) {
        return Ok(value.clone());
    }
    if let Some(info) = processor.parameters.get(name) {
        if let Some(default) = info.default.value() {
            return Ok(default.clone());
        }
    }
    Err(ConfigError::MissingParameter(name.to_string()))
}

/// One configuration key the processor does not recognise (§4.G).
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownParameter {
    pub name: String,
    pub reason: &'static str,
}

/// `classifyUnknownConfigParams` (§4.G): every configuration key not in the processor's declared
/// parameter set is reported, never silently ignored.
pub fn classify_unknown_config_params(
    processor: &ProcessorMetadata,
    processor_config: &Map<String, Value>,
) -> Vec<UnknownParameter> {
    processor_config
        .keys()
        .filter(|name| !processor.parameters.contains_key(*name))
        .map(|name| UnknownParameter {
            name: name.clone(),
            reason: "unknown_parameter",
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_types::ParameterInfo;
    use serde_json::json;

    fn metadata_with_default() -> ProcessorMetadata {
        ProcessorMetadata::new("Op", semantiva_processors::ComponentType::DataOperation)
            .with_parameter("factor", ParameterInfo::with_default("f64", json!(2.0)))
            .with_parameter("label", ParameterInfo::required("String"))
    }

    #[test]
    fn config_value_wins_over_context_and_default() {
        let meta = metadata_with_default();
        let mut config = Map::new();
        config.insert("factor".to_string(), json!(9.0));
        let mut ctx = Context::new();
        ctx.set("factor", json!(3.0));
        let resolved = resolve_runtime_value("factor", &meta, &config, &ctx).unwrap();
        assert_eq!(resolved, json!(9.0));
    }

    #[test]
    fn context_wins_over_default_when_config_absent() {
        let meta = metadata_with_default();
        let config = Map::new();
        let mut ctx = Context::new();
        ctx.set("factor", json!(3.0));
        let resolved = resolve_runtime_value("factor", &meta, &config, &ctx).unwrap();
        assert_eq!(resolved, json!(3.0));
    }

    #[test]
    fn default_is_used_when_config_and_context_absent() {
        let meta = metadata_with_default();
        let config = Map::new();
        let ctx = Context::new();
        let resolved = resolve_runtime_value("factor", &meta, &config, &ctx).unwrap();
        assert_eq!(resolved, json!(2.0));
    }

    #[test]
    fn missing_required_parameter_fails() {
        let meta = metadata_with_default();
        let config = Map::new();
        let ctx = Context::new();
        let err = resolve_runtime_value("label", &meta, &config, &ctx).unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("label".to_string()));
    }

    #[test]
    fn unknown_config_keys_are_reported() {
        let meta = metadata_with_default();
        let mut config = Map::new();
        config.insert("factor".to_string(), json!(1.0));
        config.insert("mystery".to_string(), json!("oops"));
        let unknown = classify_unknown_config_params(&meta, &config);
        assert_eq!(unknown, vec![UnknownParameter { name: "mystery".to_string(), reason: "unknown_parameter" }]);
    }
}
