use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel distinguishing "no default declared" from a legitimate `null` default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterDefault {
    NoDefault,
    Value(Value),
}

impl ParameterDefault {
    pub fn is_defined(&self) -> bool {
        matches!(self, ParameterDefault::Value(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            ParameterDefault::Value(v) => Some(v),
            ParameterDefault::NoDefault => None,
        }
    }
}

/// Per-parameter metadata attached to a processor (§3): `{ default, annotation }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub default: ParameterDefault,
    pub annotation: String,
}

impl ParameterInfo {
    pub fn required(annotation: impl Into<String>) -> Self {
        Self {
            default: ParameterDefault::NoDefault,
            annotation: annotation.into(),
        }
    }

    pub fn with_default(annotation: impl Into<String>, default: Value) -> Self {
        Self {
            default: ParameterDefault::Value(default),
            annotation: annotation.into(),
        }
    }
}
