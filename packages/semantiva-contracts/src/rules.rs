use std::collections::BTreeMap;

use serde_json::json;

use semantiva_processors::{ComponentType, ProcessorMetadata};

use crate::diagnostic::{Diagnostic, Severity};
use crate::messages::render;

const DEFAULT_DOCSTRING_LIMIT: usize = 600;

/// Reads `SEMANTIVA_DOCSTRING_MAX_CHARS` on every call, rather than once at startup, so a caller
/// that changes the environment between validations (as the test suite does) sees it take effect
/// immediately.
fn docstring_limit() -> usize {
    std::env::var("SEMANTIVA_DOCSTRING_MAX_CHARS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_DOCSTRING_LIMIT)
}

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

fn has_duplicates(keys: &[String]) -> bool {
    let mut seen = std::collections::HashSet::new();
    keys.iter().any(|k| !seen.insert(k))
}

/// Runs the metadata-shape and per-category rules (SVA100-250) against one processor's
/// published `ProcessorMetadata` (§4.H).
///
/// SVA001-012 (class-method shape) and SVA107 (registry/category cross-reference) have no
/// counterpart here: Rust processors take `&self` uniformly (there is no "classmethod" shape to
/// police, see `ProcessorMetadata`'s doc comment) and a metadata value alone carries no live
/// reference back to the `ProcessorRegistry` it may or may not be registered in. Likewise
/// SVA103/221/232 ("parameters shape") and SVA240/241 ("no IO requirements" / "must not override
/// operate_context") can never fire: `parameters` is a typed `IndexMap`, not an arbitrary JSON
/// value, and there is no virtual `operate_context` method to override. SVA101 ("metadata must
/// include class_name/docstring/component_type") is likewise unreachable: those are required,
/// non-optional fields on `ProcessorMetadata`, not dict keys that could be missing. All of these
/// are kept in `messages.rs` for catalog completeness but are intentionally absent below.
pub fn validate_metadata(component: &str, md: &ProcessorMetadata) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    let limit = docstring_limit();
    if md.docstring.chars().count() > limit {
        diags.push(diag(
            "SVA102",
            Severity::Warn,
            component,
            BTreeMap::from([
                ("actual".to_string(), json!(md.docstring.chars().count())),
                ("limit".to_string(), json!(limit)),
            ]),
        ));
    }

    if let Some(keys) = &md.injected_context_keys {
        if has_duplicates(keys) {
            diags.push(diag("SVA104", Severity::Error, component, BTreeMap::new()));
        }
    }
    if let Some(keys) = &md.suppressed_context_keys {
        if has_duplicates(keys) {
            diags.push(diag("SVA105", Severity::Error, component, BTreeMap::new()));
        }
    }
    if let (Some(injected), Some(suppressed)) = (&md.injected_context_keys, &md.suppressed_context_keys) {
        let overlap: Vec<String> = injected.iter().filter(|k| suppressed.contains(k)).cloned().collect();
        if !overlap.is_empty() {
            diags.push(diag(
                "SVA106",
                Severity::Warn,
                component,
                BTreeMap::from([("overlap".to_string(), json!(overlap))]),
            ));
        }
    }

    match md.component_type {
        ComponentType::DataSource | ComponentType::PayloadSource => {
            if md.output_data_type.is_none() {
                diags.push(diag("SVA200", Severity::Error, component, BTreeMap::new()));
            }
            if md.input_data_type.is_some() {
                diags.push(diag("SVA201", Severity::Warn, component, BTreeMap::new()));
            }
        }
        ComponentType::DataSink | ComponentType::PayloadSink => {
            if md.input_data_type.is_none() {
                diags.push(diag("SVA210", Severity::Error, component, BTreeMap::new()));
            }
            if md.output_data_type.is_some() {
                diags.push(diag("SVA211", Severity::Warn, component, BTreeMap::new()));
            }
        }
        ComponentType::DataOperation => {
            if md.input_data_type.is_none() || md.output_data_type.is_none() {
                diags.push(diag("SVA220", Severity::Error, component, BTreeMap::new()));
            }
        }
        ComponentType::DataProbe => {
            if md.input_data_type.is_none() {
                diags.push(diag("SVA230", Severity::Error, component, BTreeMap::new()));
            }
            if md.output_data_type.is_some() {
                diags.push(diag("SVA231", Severity::Warn, component, BTreeMap::new()));
            }
        }
        ComponentType::ContextProcessor => {}
    }

    if let Some(d) = check_sva250(component, md) {
        diags.push(d);
    }

    diags
}

/// SVA250: a processor must not accept a parameter literally named `context`, nor declare a
/// parameter whose annotation names the Context type — both are hidden-state-coupling smells
/// (§4.H), grounded on
/// `tests/contracts_sva/test_sva250_no_context_in_process_logic.py`.
fn check_sva250(component: &str, md: &ProcessorMetadata) -> Option<Diagnostic> {
    let offends = md.parameters.iter().any(|(name, info)| {
        name == "context" || info.annotation.contains("Context")
    });
    if offends {
        Some(diag("SVA250", Severity::Error, component, BTreeMap::new()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_types::ParameterInfo;

    fn source_metadata() -> ProcessorMetadata {
        ProcessorMetadata::new("Source", ComponentType::DataSource)
    }

    #[test]
    fn source_without_output_type_is_an_error() {
        let md = source_metadata();
        let diags = validate_metadata("Source", &md);
        assert!(diags.iter().any(|d| d.code == "SVA200"));
    }

    #[test]
    fn source_with_input_type_is_a_warning() {
        let md = source_metadata().with_output_type("NumberValue").with_input_type("NoData");
        let diags = validate_metadata("Source", &md);
        assert!(diags.iter().any(|d| d.code == "SVA201"));
    }

    #[test]
    fn sink_requires_input_type() {
        let md = ProcessorMetadata::new("Sink", ComponentType::DataSink);
        let diags = validate_metadata("Sink", &md);
        assert!(diags.iter().any(|d| d.code == "SVA210"));
    }

    #[test]
    fn operation_requires_both_types() {
        let md = ProcessorMetadata::new("Op", ComponentType::DataOperation).with_input_type("NumberValue");
        let diags = validate_metadata("Op", &md);
        assert!(diags.iter().any(|d| d.code == "SVA220"));
    }

    #[test]
    fn probe_forbids_output_type() {
        let md = ProcessorMetadata::new("Probe", ComponentType::DataProbe)
            .with_input_type("NumberValue")
            .with_output_type("NumberValue");
        let diags = validate_metadata("Probe", &md);
        assert!(diags.iter().any(|d| d.code == "SVA231"));
    }

    #[test]
    fn duplicate_injected_keys_are_rejected() {
        let md = ProcessorMetadata::new("Op", ComponentType::DataOperation)
            .with_input_type("NumberValue")
            .with_output_type("NumberValue")
            .with_injected_context_keys(vec!["a".to_string(), "a".to_string()]);
        let diags = validate_metadata("Op", &md);
        assert!(diags.iter().any(|d| d.code == "SVA104"));
    }

    #[test]
    fn overlapping_injected_and_suppressed_keys_warn() {
        let md = ProcessorMetadata::new("Op", ComponentType::DataOperation)
            .with_input_type("NumberValue")
            .with_output_type("NumberValue")
            .with_injected_context_keys(vec!["a".to_string()])
            .with_suppressed_context_keys(vec!["a".to_string()]);
        let diags = validate_metadata("Op", &md);
        assert!(diags.iter().any(|d| d.code == "SVA106"));
    }

    #[test]
    fn parameter_named_context_is_rejected() {
        let md = ProcessorMetadata::new("Op", ComponentType::DataOperation)
            .with_input_type("NumberValue")
            .with_output_type("NumberValue")
            .with_parameter("context", ParameterInfo::required("ContextType"));
        let diags = validate_metadata("Op", &md);
        assert!(diags.iter().any(|d| d.code == "SVA250"));
    }

    #[test]
    fn parameter_annotated_with_context_type_is_rejected() {
        let md = ProcessorMetadata::new("Op", ComponentType::DataOperation)
            .with_input_type("NumberValue")
            .with_output_type("NumberValue")
            .with_parameter("ctx", ParameterInfo::required("ContextType"));
        let diags = validate_metadata("Op", &md);
        assert!(diags.iter().any(|d| d.code == "SVA250"));
    }

    #[test]
    fn well_formed_metadata_has_no_diagnostics() {
        let md = ProcessorMetadata::new("Op", ComponentType::DataOperation)
            .with_docstring("short")
            .with_input_type("NumberValue")
            .with_output_type("NumberValue");
        assert!(validate_metadata("Op", &md).is_empty());
    }

    #[test]
    fn docstring_limit_honors_the_environment_override() {
        std::env::set_var("SEMANTIVA_DOCSTRING_MAX_CHARS", "5");
        let md = ProcessorMetadata::new("Op", ComponentType::DataOperation)
            .with_docstring("way too long for five characters")
            .with_input_type("NumberValue")
            .with_output_type("NumberValue");
        let diags = validate_metadata("Op", &md);
        std::env::remove_var("SEMANTIVA_DOCSTRING_MAX_CHARS");
        assert!(diags.iter().any(|d| d.code == "SVA102"));
    }
}
