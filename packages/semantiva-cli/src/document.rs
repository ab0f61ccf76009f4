//! Pipeline document schema and loading (SPEC_FULL.md §6).
//!
//! A pipeline document is logically `{extensions?, pipeline: {nodes: [...]}, fanout?|run_space?,
//! trace?}`. It is read as a generic [`serde_json::Value`] first (after YAML parsing) so
//! `--set`/`--context` dotted-path overrides can be applied the way `cli.py`'s `_apply_override`
//! does, then deserialized into the typed sections below only once overrides have landed.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use semantiva_config::NodeConfig;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid pipeline configuration: YAML file must contain a 'pipeline' section with a 'nodes' list")]
    InvalidStructure,
    #[error("unknown override key: {0}")]
    UnknownOverrideKey(String),
    #[error("invalid override format: {0}")]
    InvalidOverrideFormat(String),
    #[error("{0}")]
    InvalidSection(String),
}

/// Reads and parses a pipeline YAML file into a generic JSON tree, distinguishing "file missing"
/// from "malformed YAML" the way `cli.py`'s `_load_yaml` does (the CLI maps these to different
/// exit codes).
pub fn load_yaml(path: &Path) -> Result<Value, DocumentError> {
    let text = std::fs::read_to_string(path).map_err(|_| DocumentError::FileNotFound(path.display().to_string()))?;
    Ok(serde_yaml::from_str(&text)?)
}

/// `_apply_override` (cli.py): walks `key.split('.')` through nested maps/sequences, replacing
/// the leaf. Every path component except the last must already exist; the last key must also
/// already exist in its parent (no override may introduce a brand-new key) — a strict "else
/// raise KeyError" behaviour.
pub fn apply_override(config: &mut Value, key: &str, value: Value) -> Result<(), DocumentError> {
    let parts: Vec<&str> = key.split('.').collect();
    let mut target = config;
    for part in &parts[..parts.len() - 1] {
        target = step_into(target, part, key)?;
    }
    let last = parts[parts.len() - 1];
    match target {
        Value::Sequence(seq) => {
            let idx: usize = last.parse().map_err(|_| DocumentError::UnknownOverrideKey(key.to_string()))?;
            if idx >= seq.len() {
                return Err(DocumentError::UnknownOverrideKey(key.to_string()));
            }
            seq[idx] = value;
            Ok(())
        }
        Value::Mapping(map) => {
            let map_key = Value::String(last.to_string());
            if !map.contains_key(&map_key) {
                return Err(DocumentError::UnknownOverrideKey(key.to_string()));
            }
            map.insert(map_key, value);
            Ok(())
        }
        _ => Err(DocumentError::UnknownOverrideKey(key.to_string())),
    }
}

fn step_into<'a>(target: &'a mut Value, part: &str, full_key: &str) -> Result<&'a mut Value, DocumentError> {
    match target {
        Value::Sequence(seq) => {
            let idx: usize = part.parse().map_err(|_| DocumentError::UnknownOverrideKey(full_key.to_string()))?;
            seq.get_mut(idx).ok_or_else(|| DocumentError::UnknownOverrideKey(full_key.to_string()))
        }
        Value::Mapping(map) => map
            .get_mut(&Value::String(part.to_string()))
            .ok_or_else(|| DocumentError::UnknownOverrideKey(full_key.to_string())),
        _ => Err(DocumentError::UnknownOverrideKey(full_key.to_string())),
    }
}

/// `_validate_structure` (cli.py): confirms the document has a `pipeline.nodes` list and returns
/// it, still as raw JSON (typed `NodeConfig` deserialization happens right after, in the caller,
/// so the "wrong shape" and "YAML-valid-but-not-a-pipeline" errors stay distinguishable).
pub fn validate_structure(config: &Value) -> Result<Vec<NodeConfig>, DocumentError> {
    let nodes_value = config
        .get("pipeline")
        .and_then(|p| p.get("nodes"))
        .filter(|n| n.is_array())
        .ok_or(DocumentError::InvalidStructure)?;
    serde_json::from_value(nodes_value.clone()).map_err(|_| DocumentError::InvalidStructure)
}

/// `extensions:` may appear at the document's top level or nested under `pipeline:` (cli.py
/// checks both, falling back to the nested location only when the top-level field is absent).
pub fn extensions_of(config: &Value) -> Vec<String> {
    let top = config.get("extensions").and_then(Value::as_array);
    let nested = config.get("pipeline").and_then(|p| p.get("extensions")).and_then(Value::as_array);
    let chosen = top.or(nested);
    chosen
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// `trace: { driver, output_path, options: { detail } }` (§6), parsed only when present; CLI
/// flags always take precedence over this section when both are given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceSection {
    pub driver: Option<String>,
    pub output_path: Option<String>,
    #[serde(default)]
    pub options: TraceOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceOptions {
    pub detail: Option<String>,
}

pub fn trace_section_of(config: &Value) -> Option<TraceSection> {
    config.get("trace").and_then(|t| serde_json::from_value(t.clone()).ok())
}

/// `fanout? | run_space?` (§6, §4.K): a document declares at most one of the two.
pub enum FanoutOrRunSpace {
    Fanout(semantiva_engine::FanoutSpec),
    RunSpace(semantiva_engine::RunSpaceSpec),
}

pub fn fanout_or_run_space_of(config: &Value) -> Result<Option<FanoutOrRunSpace>, DocumentError> {
    if let Some(fanout) = config.get("fanout") {
        let spec = serde_json::from_value(fanout.clone())
            .map_err(|e| DocumentError::InvalidSection(format!("invalid 'fanout' section: {e}")))?;
        return Ok(Some(FanoutOrRunSpace::Fanout(spec)));
    }
    if let Some(run_space) = config.get("run_space") {
        let spec = serde_json::from_value(run_space.clone())
            .map_err(|e| DocumentError::InvalidSection(format!("invalid 'run_space' section: {e}")))?;
        return Ok(Some(FanoutOrRunSpace::RunSpace(spec)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_override_replaces_a_nested_scalar() {
        let mut config = json!({"pipeline": {"nodes": [{"processor": "A", "parameters": {"n": 1}}]}});
        apply_override(&mut config, "pipeline.nodes.0.parameters.n", json!(42)).unwrap();
        assert_eq!(config["pipeline"]["nodes"][0]["parameters"]["n"], json!(42));
    }

    #[test]
    fn apply_override_rejects_an_unknown_key() {
        let mut config = json!({"pipeline": {"nodes": []}});
        let err = apply_override(&mut config, "pipeline.missing", json!(1)).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownOverrideKey(_)));
    }

    #[test]
    fn validate_structure_requires_a_pipeline_nodes_list() {
        let config = json!({"not_pipeline": true});
        let err = validate_structure(&config).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidStructure));
    }

    #[test]
    fn validate_structure_returns_typed_node_configs() {
        let config = json!({"pipeline": {"nodes": [{"processor": "Thing", "parameters": {}}]}});
        let nodes = validate_structure(&config).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].processor, "Thing");
    }

    #[test]
    fn extensions_fall_back_to_the_nested_pipeline_field() {
        let config = json!({"pipeline": {"nodes": [], "extensions": ["semantiva-examples"]}});
        assert_eq!(extensions_of(&config), vec!["semantiva-examples".to_string()]);
    }
}
