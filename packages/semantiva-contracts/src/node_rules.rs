use std::collections::BTreeMap;

use serde_json::json;

use semantiva_processors::Node;

use crate::diagnostic::{Diagnostic, Severity};
use crate::messages::render;

fn diag(code: &'static str, severity: Severity, component: &str, details: BTreeMap<String, serde_json::Value>) -> Diagnostic {
    let message = render(code, &details);
    Diagnostic {
        code,
        severity,
        message,
        component: component.to_string(),
        location: None,
        details,
    }
}

/// Runs the node-wrapper coherence rules (SVA300-321) against a single `Node` (§4.C, §4.H).
///
/// `Node` delegates `metadata()`/`input_data_type()`/`output_data_type()` straight to the wrapped
/// processor (see `semantiva_processors::Node`), so 301/311/321 can only ever fire if a future
/// `Node` variant stops delegating faithfully; they are kept as real, always-run checks rather
/// than removed, since that is exactly the regression they exist to catch.
pub fn validate_node(component: &str, node: &Node) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let input = node.input_data_type();
    let output = node.output_data_type();
    let proc_input = node.metadata().input_data_type;
    let proc_output = node.metadata().output_data_type;

    match node {
        Node::DataSource(_) | Node::PayloadSource(_) => {
            if input.is_some() {
                diags.push(diag("SVA300", Severity::Error, component, BTreeMap::new()));
            }
            if output != proc_output {
                diags.push(diag(
                    "SVA301",
                    Severity::Error,
                    component,
                    BTreeMap::from([
                        ("node".to_string(), json!(output.clone())),
                        ("proc".to_string(), json!(proc_output.clone())),
                    ]),
                ));
            }
        }
        Node::DataSink(_) | Node::PayloadSink(_) => {
            if let Some(out) = &output {
                if Some(out) != input.as_ref() {
                    diags.push(diag("SVA310", Severity::Error, component, BTreeMap::new()));
                }
            }
            if (input.is_some() && input != proc_input) || (output.is_some() && output != proc_input) {
                diags.push(diag(
                    "SVA311",
                    Severity::Error,
                    component,
                    BTreeMap::from([
                        ("node_in".to_string(), json!(input.clone())),
                        ("node_out".to_string(), json!(output.clone())),
                        ("proc".to_string(), json!(proc_input.clone())),
                    ]),
                ));
            }
        }
        Node::ProbeContextInjector(_) | Node::ProbeResultCollector(_) => {
            if let Some(out) = &output {
                if Some(out) != input.as_ref() {
                    diags.push(diag("SVA320", Severity::Error, component, BTreeMap::new()));
                }
            }
            if (input.is_some() && input != proc_input) || (output.is_some() && output != proc_input) {
                diags.push(diag(
                    "SVA321",
                    Severity::Error,
                    component,
                    BTreeMap::from([
                        ("node_in".to_string(), json!(input.clone())),
                        ("node_out".to_string(), json!(output.clone())),
                        ("proc".to_string(), json!(proc_input.clone())),
                    ]),
                ));
            }
        }
        Node::DataOperation(_)
        | Node::DataOperationContextInjectorProbe(_)
        | Node::ContextDataProcessor(_)
        | Node::ContextProcessor(_) => {}
    }

    diags
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_processors::{ComponentType, DataSourceNode, ParamMap, ProcessorMetadata, Result as ProcResult};
    use semantiva_types::DataValue;

    struct StubSource;
    impl semantiva_processors::DataSource for StubSource {
        fn metadata(&self) -> ProcessorMetadata {
            ProcessorMetadata::new("StubSource", ComponentType::DataSource).with_output_type("NumberValue")
        }
        fn produce(&self, _params: &ParamMap) -> ProcResult<DataValue> {
            Ok(DataValue::NoData)
        }
    }

    #[test]
    fn source_node_with_no_input_and_matching_output_is_clean() {
        let node = Node::DataSource(DataSourceNode { source: Box::new(StubSource) });
        assert!(validate_node("StubSource", &node).is_empty());
    }
}
