use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use semantiva_config::{classify_unknown_config_params, UnknownParameter};
use semantiva_processors::Node;
use semantiva_types::type_hierarchy::NO_DATA;
use semantiva_types::TypeHierarchy;

use crate::error::{EngineError, Result};

/// One node's static profile, built without running anything (§4.I): the per-node facts a
/// reviewer or a `dev lint`/`inspect --extended` command wants without having to execute the
/// pipeline.
#[derive(Debug, Clone)]
pub struct NodeInspection {
    pub index: usize,
    pub class_name: String,
    pub input_data_type: Option<String>,
    pub output_data_type: Option<String>,
    pub created_context_keys: Vec<String>,
    pub suppressed_context_keys: Vec<String>,
    pub required_context_keys: Vec<String>,
    pub unknown_parameters: Vec<UnknownParameter>,
    /// Required context keys with no producing node (empty once the pipeline validates).
    pub missing_required_keys: Vec<String>,
    /// For every required key that *is* producible, the index of the node that writes it.
    pub context_key_origins: BTreeMap<String, usize>,
}

/// The full static model of a pipeline (§4.I): one [`NodeInspection`] per node, in declared
/// order, plus whether the pipeline is externally driven (its first node takes a caller-supplied
/// payload rather than `NoData`).
#[derive(Debug, Clone)]
pub struct PipelineInspection {
    pub nodes: Vec<NodeInspection>,
    pub externally_driven: bool,
}

fn node_suppressed_keys(node: &Node) -> Vec<String> {
    match node {
        Node::ContextProcessor(n) => n.processor.suppressed_keys(),
        _ => Vec::new(),
    }
}

/// `buildPipelineInspection` (§4.I): walks the nodes in declared order, tracking which context
/// keys are available (written by an earlier node) at each point, so every node's
/// `missing_required_keys` and `context_key_origins` can be computed in a single pass.
pub fn build_pipeline_inspection(
    nodes: &[Node],
    node_configs: &[Map<String, Value>],
    externally_driven: bool,
) -> PipelineInspection {
    let mut produced_by: HashMap<String, usize> = HashMap::new();
    let mut inspections = Vec::with_capacity(nodes.len());

    for (index, node) in nodes.iter().enumerate() {
        let metadata = node.metadata();
        let config = node_configs.get(index).cloned().unwrap_or_default();

        let required_context_keys = node.context_reads();
        let mut missing_required_keys = Vec::new();
        let mut context_key_origins = BTreeMap::new();
        for key in &required_context_keys {
            if let Some(&origin) = produced_by.get(key) {
                context_key_origins.insert(key.clone(), origin);
            } else {
                missing_required_keys.push(key.clone());
            }
        }

        let unknown_parameters = classify_unknown_config_params(&metadata, &config);
        let created_context_keys = node.context_writes();
        let suppressed_context_keys = node_suppressed_keys(node);

        for key in &created_context_keys {
            produced_by.insert(key.clone(), index);
        }
        for key in &suppressed_context_keys {
            produced_by.remove(key);
        }

        inspections.push(NodeInspection {
            index,
            class_name: metadata.class_name,
            input_data_type: metadata.input_data_type,
            output_data_type: metadata.output_data_type,
            created_context_keys,
            suppressed_context_keys,
            required_context_keys,
            unknown_parameters,
            missing_required_keys,
            context_key_origins,
        });
    }

    PipelineInspection { nodes: inspections, externally_driven }
}

/// `validatePipeline` (§4.I): adjacent type compatibility, context-key producibility, and
/// absence of unknown parameters. Fails fast on the first violation found in declared node
/// order, surfaced as a `PipelineConfigurationError` naming the offending node.
pub fn validate_pipeline(inspection: &PipelineInspection, type_hierarchy: &TypeHierarchy) -> Result<()> {
    for (i, node) in inspection.nodes.iter().enumerate() {
        if i == 0 && !inspection.externally_driven {
            if let Some(input_type) = &node.input_data_type {
                if input_type != NO_DATA {
                    return Err(EngineError::PipelineConfigurationError {
                        node_index: 0,
                        reason: format!(
                            "the first node's input type must be '{NO_DATA}' unless the pipeline is externally \
                             driven, got '{input_type}'"
                        ),
                    });
                }
            }
        }

        if i > 0 {
            let prev = &inspection.nodes[i - 1];
            if let (Some(prev_out), Some(cur_in)) = (&prev.output_data_type, &node.input_data_type) {
                if !type_hierarchy.is_compatible(prev_out, cur_in) {
                    return Err(EngineError::PipelineConfigurationError {
                        node_index: i,
                        reason: format!(
                            "node {i} ('{}') expects input type '{cur_in}' but node {} ('{}') produces '{prev_out}'",
                            node.class_name,
                            i - 1,
                            prev.class_name
                        ),
                    });
                }
            }
        }

        if !node.missing_required_keys.is_empty() {
            return Err(EngineError::PipelineConfigurationError {
                node_index: i,
                reason: format!(
                    "required context key(s) {:?} are not produced by any earlier node",
                    node.missing_required_keys
                ),
            });
        }

        if !node.unknown_parameters.is_empty() {
            let names: Vec<&str> = node.unknown_parameters.iter().map(|u| u.name.as_str()).collect();
            return Err(EngineError::PipelineConfigurationError {
                node_index: i,
                reason: format!("unknown configuration parameter(s): {names:?}"),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_processors::{
        ComponentType, ContextObserver, ContextProcessor, DataOperation, DataSourceNode, DataValue, ParamMap,
        ProcessorMetadata, ScalarValue,
    };

    struct NumberSource;
    impl semantiva_processors::DataSource for NumberSource {
        fn metadata(&self) -> ProcessorMetadata {
            ProcessorMetadata::new("NumberSource", ComponentType::DataSource).with_output_type("NumberValue")
        }
        fn produce(&self, _params: &ParamMap) -> semantiva_processors::Result<DataValue> {
            Ok(DataValue::Scalar(ScalarValue::Number(1.0)))
        }
    }

    struct Multiply;
    impl DataOperation for Multiply {
        fn metadata(&self) -> ProcessorMetadata {
            ProcessorMetadata::new("Multiply", ComponentType::DataOperation)
                .with_input_type("NumberValue")
                .with_output_type("NumberValue")
                .with_parameter("factor", semantiva_types::ParameterInfo::with_default("f64", serde_json::json!(2.0)))
        }
        fn process(
            &self,
            input: DataValue,
            params: &ParamMap,
            _observer: &mut dyn ContextObserver,
        ) -> semantiva_processors::Result<DataValue> {
            let factor = params.get("factor").and_then(|v| v.as_f64()).unwrap_or(1.0);
            match input {
                DataValue::Scalar(ScalarValue::Number(n)) => Ok(DataValue::Scalar(ScalarValue::Number(n * factor))),
                other => Err(semantiva_processors::ProcessorError::InputTypeMismatch {
                    expected: "NumberValue".to_string(),
                    actual: other.variant(),
                }),
            }
        }
    }

    struct RequiresAddend;
    impl ContextProcessor for RequiresAddend {
        fn metadata(&self) -> ProcessorMetadata {
            ProcessorMetadata::new("RequiresAddend", ComponentType::ContextProcessor)
        }
        fn required_keys(&self) -> Vec<String> {
            vec!["addend".to_string()]
        }
        fn created_keys(&self) -> Vec<String> {
            vec!["sum".to_string()]
        }
        fn suppressed_keys(&self) -> Vec<String> {
            Vec::new()
        }
        fn process(&self, _params: &ParamMap, _observer: &mut dyn ContextObserver) -> semantiva_processors::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn a_well_formed_source_then_operation_chain_validates() {
        let nodes = vec![
            Node::DataSource(DataSourceNode { source: Box::new(NumberSource) }),
            Node::DataOperation(semantiva_processors::DataOperationNode {
                operation: Box::new(Multiply),
                created_keys: Vec::new(),
            }),
        ];
        let configs = vec![Map::new(), Map::new()];
        let inspection = build_pipeline_inspection(&nodes, &configs, false);
        let hierarchy = TypeHierarchy::with_builtins();
        assert!(validate_pipeline(&inspection, &hierarchy).is_ok());
    }

    #[test]
    fn a_type_mismatch_between_adjacent_nodes_is_rejected() {
        struct TextSource;
        impl semantiva_processors::DataSource for TextSource {
            fn metadata(&self) -> ProcessorMetadata {
                ProcessorMetadata::new("TextSource", ComponentType::DataSource).with_output_type("TextValue")
            }
            fn produce(&self, _params: &ParamMap) -> semantiva_processors::Result<DataValue> {
                Ok(DataValue::Scalar(ScalarValue::Text("x".to_string())))
            }
        }

        let nodes = vec![
            Node::DataSource(DataSourceNode { source: Box::new(TextSource) }),
            Node::DataOperation(semantiva_processors::DataOperationNode {
                operation: Box::new(Multiply),
                created_keys: Vec::new(),
            }),
        ];
        let configs = vec![Map::new(), Map::new()];
        let inspection = build_pipeline_inspection(&nodes, &configs, false);
        let hierarchy = TypeHierarchy::with_builtins();
        let err = validate_pipeline(&inspection, &hierarchy).unwrap_err();
        assert!(matches!(err, EngineError::PipelineConfigurationError { node_index: 1, .. }));
    }

    #[test]
    fn a_required_context_key_with_no_producer_is_rejected() {
        let nodes = vec![Node::ContextProcessor(semantiva_processors::ContextProcessorNode {
            processor: Box::new(RequiresAddend),
        })];
        let configs = vec![Map::new()];
        let inspection = build_pipeline_inspection(&nodes, &configs, true);
        let hierarchy = TypeHierarchy::with_builtins();
        let err = validate_pipeline(&inspection, &hierarchy).unwrap_err();
        assert!(matches!(err, EngineError::PipelineConfigurationError { node_index: 0, .. }));
    }

    #[test]
    fn an_unknown_configuration_parameter_is_rejected() {
        let nodes = vec![
            Node::DataSource(DataSourceNode { source: Box::new(NumberSource) }),
            Node::DataOperation(semantiva_processors::DataOperationNode {
                operation: Box::new(Multiply),
                created_keys: Vec::new(),
            }),
        ];
        let mut bogus = Map::new();
        bogus.insert("not_a_real_param".to_string(), serde_json::json!(1));
        let configs = vec![Map::new(), bogus];
        let inspection = build_pipeline_inspection(&nodes, &configs, false);
        let hierarchy = TypeHierarchy::with_builtins();
        let err = validate_pipeline(&inspection, &hierarchy).unwrap_err();
        assert!(matches!(err, EngineError::PipelineConfigurationError { node_index: 1, .. }));
    }
}
