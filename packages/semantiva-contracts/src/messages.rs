use std::collections::BTreeMap;

use serde_json::Value;

/// The full SVA code -> message template catalog, carried over verbatim from
/// `contracts/messages.py`. SVA001-012 and SVA107 have no check implementation in this crate
/// (see `rules.rs`) but their messages are kept here so the catalog stays complete and
/// `MESSAGE` stays the single source of truth for every documented code.
pub const MESSAGES: &[(&str, &str)] = &[
    ("SVA001", "Method `input_data_type` must be a @classmethod (callable as cls.input_data_type())."),
    ("SVA002", "Method `output_data_type` must be a @classmethod (callable as cls.output_data_type())."),
    ("SVA003", "Methods ending with `_data_type` must be @classmethods."),
    ("SVA004", "{method} must return a type (got {got})."),
    ("SVA005", "Method `_get_data` must be a @classmethod for stateless data sources."),
    ("SVA006", "Method `get_data` must be a @classmethod for stateless data sources."),
    ("SVA007", "Method `_get_payload` must be a @classmethod for stateless payload sources."),
    ("SVA008", "Method `get_payload` must be a @classmethod for stateless payload sources."),
    ("SVA009", "Method `_send_data` must be a @classmethod for stateless data sinks."),
    ("SVA010", "Method `send_data` must be a @classmethod for stateless data sinks."),
    ("SVA011", "Method `_send_payload` must be a @classmethod for stateless payload sinks."),
    ("SVA012", "Method `send_payload` must be a @classmethod for stateless payload sinks."),
    ("SVA100", "{where} must return dict."),
    ("SVA101", "Metadata must include keys: class_name, docstring, component_type (missing: {missing})."),
    ("SVA102", "Docstring exceeds recommended length ({actual} > {limit}). Consider a concise summary."),
    ("SVA103", "`parameters` must be dict, list, 'None', or {{}}."),
    ("SVA104", "`injected_context_keys` must be a list of unique strings."),
    ("SVA105", "`suppressed_context_keys` must be a list of unique strings."),
    ("SVA106", "`injected_context_keys` overlaps `suppressed_context_keys`: {overlap}."),
    ("SVA107", "Component registry/category mismatch for {component_type}."),
    ("SVA200", "DataSource/PayloadSource must define `output_data_type` in metadata."),
    ("SVA201", "DataSource/PayloadSource should not define `input_data_type` in metadata."),
    ("SVA210", "DataSink/PayloadSink must define `input_data_type` in metadata."),
    ("SVA211", "DataSink/PayloadSink should not define `output_data_type` in metadata."),
    ("SVA220", "DataOperation must define `input_data_type` and `output_data_type` in metadata."),
    ("SVA221", "Parameters shape invalid for DataOperation."),
    ("SVA230", "DataProbe must define `input_data_type` in metadata."),
    ("SVA231", "DataProbe should omit `output_data_type` in metadata (pass-through semantics)."),
    ("SVA232", "Parameters shape invalid for DataProbe."),
    ("SVA240", "ContextProcessor has no IO requirements; classmethod rules still apply if present."),
    ("SVA241", "ContextProcessor must not override operate_context method. Implement _process_logic instead."),
    ("SVA250", "Processor must not declare a parameter named `context` nor annotate a parameter with the Context type."),
    ("SVA300", "Source Node input type must be NoData."),
    ("SVA301", "Source Node output must equal processor.output_data_type() (got {node} vs {proc})."),
    ("SVA310", "Sink/Probe Node input/output must match (pass-through)."),
    ("SVA311", "Sink Node input/output must both equal processor.input_data_type() (got {node_in}/{node_out} vs {proc})."),
    ("SVA320", "Probe Node input/output must match (pass-through)."),
    ("SVA321", "Probe Node input/output must both equal processor.input_data_type() (got {node_in}/{node_out} vs {proc})."),
];

/// Fills `{key}` placeholders in a message template from `details`, rendering JSON strings
/// without surrounding quotes and everything else via its `Display`/`to_string` form.
pub fn render(code: &str, details: &BTreeMap<String, Value>) -> String {
    let template = MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, m)| *m)
        .unwrap_or(code);
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            if chars.peek() == Some(&'{') {
                chars.next();
                out.push('{');
                continue;
            }
            let mut key = String::new();
            for c2 in chars.by_ref() {
                if c2 == '}' {
                    break;
                }
                key.push(c2);
            }
            if key == "}" {
                out.push('}');
                continue;
            }
            let rendered = details
                .get(&key)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            out.push_str(&rendered);
        } else if c == '}' && chars.peek() == Some(&'}') {
            chars.next();
            out.push('}');
        } else {
            out.push(c);
        }
    }
    out
}
