use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use semantiva_processors::ProcessorInstance;
use semantiva_registry::{resolve_symbol, NameResolverRegistry, ParameterResolverRegistry, ProcessorRegistry};

use crate::error::{ConfigError, Result};
use crate::sweep::{ParameterSweepDirective, ParametricSweepFactory};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeriveDirective {
    pub parameter_sweep: Option<ParameterSweepDirective>,
}

/// One node as it appears in a pipeline document, before symbol resolution (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub processor: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub context_keyword: Option<String>,
    pub input_context_keyword: Option<String>,
    pub output_context_keyword: Option<String>,
    #[serde(default)]
    pub derive: Option<DeriveDirective>,
}

/// A node's processor, either still a symbol to resolve normally or already constructed by
/// preprocessing (a parametric sweep has no stable registry name: the factory builds one value
/// per node, so there is nothing meaningful to register it under).
pub enum ProcessorSource {
    Symbol(String),
    Generated(ProcessorInstance),
}

/// A node after `derive` directives have been desugared, ready for the registry/config layers
/// to finish building a `Node` (§4.F).
pub struct PreprocessedNode {
    pub processor: ProcessorSource,
    pub parameters: Map<String, Value>,
    pub context_keyword: Option<String>,
    pub input_context_keyword: Option<String>,
    pub output_context_keyword: Option<String>,
}

/// `preprocessNodeConfig` (§4.F): desugars `derive.parameter_sweep` into a generated processor
/// before the node's `processor` field is handed to symbol resolution. Any other node passes
/// through with its `processor` field left as a plain symbol. Afterwards every parameter value is
/// run through the `ParameterResolverRegistry` (§4.G), which rewrites recognised scalar strings
/// (e.g. `model:ClassName:k=v`) into their descriptor form; values no resolver claims pass
/// through untouched, so this is a no-op for pipelines that don't use the syntax.
pub fn preprocess_node_config(
    cfg: &NodeConfig,
    processor_registry: &ProcessorRegistry,
    name_resolvers: &NameResolverRegistry,
    parameter_resolvers: &ParameterResolverRegistry,
) -> Result<PreprocessedNode> {
    let processor = match &cfg.derive {
        Some(DeriveDirective { parameter_sweep: Some(sweep) }) => {
            let inner = resolve_symbol(&cfg.processor, processor_registry, name_resolvers)
                .map_err(|e| ConfigError::Other(e.to_string()))?;
            ProcessorSource::Generated(ParametricSweepFactory::build(sweep.clone(), inner)?)
        }
        _ => ProcessorSource::Symbol(cfg.processor.clone()),
    };

    let resolved = parameter_resolvers
        .resolve_value(&Value::Object(cfg.parameters.clone()))
        .map_err(|e| ConfigError::Other(e.to_string()))?;
    let parameters = match resolved {
        Value::Object(map) => map,
        other => return Err(ConfigError::Other(format!("parameter resolution produced a non-object: {other}"))),
    };

    Ok(PreprocessedNode {
        processor,
        parameters,
        context_keyword: cfg.context_keyword.clone(),
        input_context_keyword: cfg.input_context_keyword.clone(),
        output_context_keyword: cfg.output_context_keyword.clone(),
    })
}
