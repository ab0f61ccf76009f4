//! Textual inspection reports for `semantiva inspect` (§6).
//!
//! Grounded on `semantiva/payload_operations/pipeline_inspector.py`'s `PipelineInspector.inspect`
//! (node-by-node summary lines, a leading "Required context keys" line, sorted/comma-joined
//! `_format_set`-style rendering); `--extended` additionally lists per-node unknown-parameter and
//! missing-required-key diagnostics, which the static `PipelineInspection` already carries but
//! the plain summary omits.

use semantiva_engine::PipelineInspection;

fn format_set<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    let mut sorted: Vec<&str> = values.into_iter().map(String::as_str).collect();
    sorted.sort_unstable();
    if sorted.is_empty() {
        "None".to_string()
    } else {
        sorted.join(", ")
    }
}

/// `summary_report` (cli.py): one block of lines per node, plus a leading line naming every
/// context key at least one node requires.
pub fn summary_report(inspection: &PipelineInspection) -> String {
    let mut lines = vec!["Pipeline Structure:".to_string()];

    let mut all_required: Vec<String> = Vec::new();
    for node in &inspection.nodes {
        for key in &node.required_context_keys {
            if !all_required.contains(key) {
                all_required.push(key.clone());
            }
        }
    }
    lines.push(format!("\tRequired context keys: {}", format_set(&all_required)));

    for node in &inspection.nodes {
        lines.push(format!("\n\t{}. Node: {}", node.index + 1, node.class_name));
        lines.push(format!(
            "\t\tInput type: {}",
            node.input_data_type.as_deref().unwrap_or("NoData")
        ));
        lines.push(format!(
            "\t\tOutput type: {}",
            node.output_data_type.as_deref().unwrap_or("NoData")
        ));
        lines.push(format!("\t\tContext additions: {}", format_set(&node.created_context_keys)));
        if !node.suppressed_context_keys.is_empty() {
            lines.push(format!("\t\tContext suppressions: {}", format_set(&node.suppressed_context_keys)));
        }
    }

    lines.join("\n")
}

/// `extended_report` (cli.py `--extended`): the summary report plus, per node, the context keys
/// it reads and where they come from, and any static diagnostics (unknown parameters, missing
/// required keys) `build_pipeline_inspection` already computed.
pub fn extended_report(inspection: &PipelineInspection) -> String {
    let mut lines = vec![summary_report(inspection), String::new(), "Node details:".to_string()];

    for node in &inspection.nodes {
        lines.push(format!("\n\t{}. Node: {}", node.index + 1, node.class_name));
        lines.push(format!("\t\tRequired context keys: {}", format_set(&node.required_context_keys)));
        for (key, origin) in &node.context_key_origins {
            lines.push(format!("\t\t\t{key} <- node {}", origin + 1));
        }
        if !node.missing_required_keys.is_empty() {
            lines.push(format!(
                "\t\tMISSING (no producing node): {}",
                format_set(&node.missing_required_keys)
            ));
        }
        if !node.unknown_parameters.is_empty() {
            let names: Vec<String> = node.unknown_parameters.iter().map(|u| u.name.clone()).collect();
            lines.push(format!("\t\tUnknown configuration parameter(s): {}", format_set(&names)));
        }
    }

    lines.join("\n")
}
