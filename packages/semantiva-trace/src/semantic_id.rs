use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Canonical JSON rendering used as the hash pre-image everywhere in this module (§4.K, §4.L):
/// "sort map keys, normalise numeric literals, strip comments". `serde_json::Value::Object` is
/// backed by a `BTreeMap` unless the `preserve_order` feature is enabled (it is not, in this
/// workspace), so `serde_json::to_string` already emits object keys in sorted order and formats
/// every `Number` the same way for the same logical value. "Strip comments" has no counterpart
/// here: canonicalisation only ever sees already-parsed JSON values, which carry no comments.
pub fn canonicalise(value: &Value) -> String {
    serde_json::to_string(value).expect("Value serialization is infallible")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// `SHA256(canonicalise(value))`, as plain lowercase hex with no prefix.
pub fn hash_canonical<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_value(value).expect("value must serialize to JSON");
    sha256_hex(canonicalise(&json).as_bytes())
}

/// `node_semantic_id = SHA256(canonicalise(processor_metadata with parameters and declared I/O))`
/// (§4.L). Depends only on the processor's own declared shape and the concrete parameter values
/// bound to this node, never on graph position.
pub fn node_semantic_id(
    class_name: &str,
    input_data_type: Option<&str>,
    output_data_type: Option<&str>,
    parameters: &Value,
) -> String {
    let pre_image = serde_json::json!({
        "class_name": class_name,
        "input_data_type": input_data_type,
        "output_data_type": output_data_type,
        "parameters": parameters,
    });
    sha256_hex(canonicalise(&pre_image).as_bytes())
}

/// One node's identity as it contributes to `pipeline_semantic_id` (§4.L): structure and payload
/// dependency only, never parameter values.
#[derive(Debug, Clone, Serialize)]
pub struct NodeIdentity {
    pub node_uuid: String,
    pub name: String,
    pub payload_from: Option<String>,
}

/// `pipeline_semantic_id = "plsemid-" + SHA256(canonicalise([{node_uuid, name, payload_from}, ...])).hex`
/// (§4.L). Order matters: this is the declared node order, not a sorted one, since it captures
/// the graph's structural shape.
pub fn pipeline_semantic_id(nodes: &[NodeIdentity]) -> String {
    format!("plsemid-{}", sha256_hex(canonicalise(&serde_json::to_value(nodes).unwrap()).as_bytes()))
}

/// `pipeline_config_id = "plcid-" + SHA256(canonicalise(sorted([node_uuid, node_semantic_id]))).hex`
/// (§4.L). Unlike `pipeline_semantic_id`, the pairs are sorted before hashing: this ID depends on
/// which semantic nodes participate, not on how they are wired together.
pub fn pipeline_config_id(mut pairs: Vec<(String, String)>) -> String {
    pairs.sort();
    format!("plcid-{}", sha256_hex(canonicalise(&serde_json::to_value(&pairs).unwrap()).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_across_calls() {
        let a = node_semantic_id("Multiply", Some("NumberValue"), Some("NumberValue"), &json!({"factor": 2.0}));
        let b = node_semantic_id("Multiply", Some("NumberValue"), Some("NumberValue"), &json!({"factor": 2.0}));
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_sensitive_to_key_order_only_in_appearance_not_in_value() {
        let a = node_semantic_id("Multiply", Some("NumberValue"), Some("NumberValue"), &json!({"factor": 2.0, "label": "x"}));
        let b = node_semantic_id("Multiply", Some("NumberValue"), Some("NumberValue"), &json!({"label": "x", "factor": 2.0}));
        assert_eq!(a, b, "canonicalisation must sort object keys before hashing");
    }

    #[test]
    fn pipeline_semantic_id_ignores_parameter_values() {
        let nodes = vec![NodeIdentity { node_uuid: "n0".to_string(), name: "Source".to_string(), payload_from: None }];
        let id = pipeline_semantic_id(&nodes);
        assert!(id.starts_with("plsemid-"));
        assert_eq!(id.len(), "plsemid-".len() + 64);
    }

    #[test]
    fn pipeline_config_id_is_order_independent_in_its_inputs() {
        let a = pipeline_config_id(vec![("n1".to_string(), "h1".to_string()), ("n0".to_string(), "h0".to_string())]);
        let b = pipeline_config_id(vec![("n0".to_string(), "h0".to_string()), ("n1".to_string(), "h1".to_string())]);
        assert_eq!(a, b);
        assert!(a.starts_with("plcid-"));
    }
}
