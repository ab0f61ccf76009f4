use serde_json::{Map, Value};

use semantiva_config::{preprocess_node_config, NodeConfig, ProcessorSource};
use semantiva_processors::{
    ContextDataProcessorKind, ContextDataProcessorNode, ContextProcessorNode, DataOperationContextInjectorProbe,
    DataOperationNode, DataSinkNode, DataSourceNode, Node, PayloadSinkNode, PayloadSourceNode, ProbeContextInjectorNode,
    ProbeResultCollectorNode, ProcessorInstance,
};
use semantiva_registry::{resolve_symbol, NameResolverRegistry, ParameterResolverRegistry, ProcessorRegistry};

use crate::error::{EngineError, Result};

/// Wraps a resolved [`ProcessorInstance`] in the `Node` variant its declared keyword
/// configuration calls for (§4.F "Node construction"). Every pipeline document field that picks
/// a node shape (`context_keyword`, `input_context_keyword`/`output_context_keyword`) is read
/// here, once, after symbol resolution has already produced a concrete processor.
pub fn build_node(
    node_index: usize,
    instance: ProcessorInstance,
    context_keyword: Option<&str>,
    input_context_keyword: Option<&str>,
    output_context_keyword: Option<&str>,
) -> Result<Node> {
    match (input_context_keyword, output_context_keyword) {
        (Some(_), None) | (None, Some(_)) => {
            return Err(EngineError::PipelineConfigurationError {
                node_index,
                reason: "input_context_keyword and output_context_keyword must both be set or both absent".to_string(),
            });
        }
        _ => {}
    }

    if let (Some(input_key), Some(output_key)) = (input_context_keyword, output_context_keyword) {
        let kind = match instance {
            ProcessorInstance::DataOperation(op) => ContextDataProcessorKind::Operation(op),
            ProcessorInstance::DataProbe(p) => ContextDataProcessorKind::Probe(p),
            _ => {
                return Err(EngineError::PipelineConfigurationError {
                    node_index,
                    reason: "input_context_keyword/output_context_keyword only apply to a DataOperation or DataProbe"
                        .to_string(),
                })
            }
        };
        return Ok(Node::ContextDataProcessor(ContextDataProcessorNode {
            processor: kind,
            input_context_key: input_key.to_string(),
            output_context_key: output_key.to_string(),
        }));
    }

    match instance {
        ProcessorInstance::DataSource(source) => Ok(Node::DataSource(DataSourceNode { source })),
        ProcessorInstance::PayloadSource(source) => {
            let injected_context_keys = source.metadata().injected_context_keys.unwrap_or_default();
            Ok(Node::PayloadSource(PayloadSourceNode { source, injected_context_keys }))
        }
        ProcessorInstance::DataSink(sink) => Ok(Node::DataSink(DataSinkNode { sink })),
        ProcessorInstance::PayloadSink(sink) => Ok(Node::PayloadSink(PayloadSinkNode { sink })),
        ProcessorInstance::DataOperation(operation) => {
            if let Some(keyword) = context_keyword {
                Ok(Node::DataOperationContextInjectorProbe(DataOperationContextInjectorProbe {
                    operation,
                    context_keyword: keyword.to_string(),
                }))
            } else {
                let created_keys = operation.metadata().injected_context_keys.unwrap_or_default();
                Ok(Node::DataOperation(DataOperationNode { operation, created_keys }))
            }
        }
        ProcessorInstance::DataProbe(probe) => {
            if let Some(keyword) = context_keyword {
                Ok(Node::ProbeContextInjector(ProbeContextInjectorNode { probe, context_keyword: keyword.to_string() }))
            } else {
                Ok(Node::ProbeResultCollector(ProbeResultCollectorNode::new(probe)))
            }
        }
        ProcessorInstance::ContextProcessor(processor) => Ok(Node::ContextProcessor(ContextProcessorNode { processor })),
    }
}

/// Turns a pipeline document's ordered list of [`NodeConfig`]s into the `Node`s the inspector
/// and step executor operate on, alongside each node's raw parameter configuration (needed
/// later for `resolve_runtime_value`/`classify_unknown_config_params`). Runs preprocessing
/// (`derive.parameter_sweep` desugaring), then symbol resolution, then node wrapping, in that
/// order, matching the data-flow diagram in §2.
pub fn build_pipeline(
    node_configs: &[NodeConfig],
    processor_registry: &ProcessorRegistry,
    name_resolvers: &NameResolverRegistry,
    parameter_resolvers: &ParameterResolverRegistry,
) -> Result<(Vec<Node>, Vec<Map<String, Value>>)> {
    let mut nodes = Vec::with_capacity(node_configs.len());
    let mut parameters = Vec::with_capacity(node_configs.len());

    for (index, cfg) in node_configs.iter().enumerate() {
        let preprocessed = preprocess_node_config(cfg, processor_registry, name_resolvers, parameter_resolvers)
            .map_err(|e| EngineError::PipelineConfigurationError { node_index: index, reason: e.to_string() })?;

        let semantiva_config::PreprocessedNode {
            processor,
            parameters: node_parameters,
            context_keyword,
            input_context_keyword,
            output_context_keyword,
        } = preprocessed;

        let instance = match processor {
            ProcessorSource::Symbol(symbol) => resolve_symbol(&symbol, processor_registry, name_resolvers)?,
            ProcessorSource::Generated(instance) => instance,
        };

        let node = build_node(
            index,
            instance,
            context_keyword.as_deref(),
            input_context_keyword.as_deref(),
            output_context_keyword.as_deref(),
        )?;
        nodes.push(node);
        parameters.push(node_parameters);
    }

    Ok((nodes, parameters))
}
