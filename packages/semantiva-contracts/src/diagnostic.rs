use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a contract rule (§4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
        }
    }
}

/// One finding produced by a rule `check` against a single component (§4.H).
///
/// Mirrors `Diagnostic` in `contracts/expectations.py`; `location` has no counterpart here since
/// Rust carries no `inspect.getsourcefile`-style introspection, so it is always `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub component: String,
    pub location: Option<(String, u32)>,
    pub details: BTreeMap<String, Value>,
}

impl Diagnostic {
    pub fn new(code: &'static str, severity: Severity, component: impl Into<String>, message: String) -> Self {
        Self {
            code,
            severity,
            message,
            component: component.into(),
            location: None,
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}
