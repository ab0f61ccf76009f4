use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `status` field of a SER record (§6 SER record layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Error,
    Skipped,
    Cancelled,
}

/// Outcome of one pre/postcondition check bundled on a SER record (§4.L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckOutcome {
    Pass,
    Fail,
    Warn,
}

/// One entry in `assertions.preconditions`/`assertions.postconditions` (§4.L).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub code: String,
    pub result: CheckOutcome,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl CheckResult {
    pub fn pass(code: impl Into<String>) -> Self {
        Self { code: code.into(), result: CheckOutcome::Pass, details: BTreeMap::new() }
    }

    pub fn fail(code: impl Into<String>, details: BTreeMap<String, Value>) -> Self {
        Self { code: code.into(), result: CheckOutcome::Fail, details }
    }
}

/// `identity` field of a SER record: `{run_id, pipeline_id, node_id, seq}` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerIdentity {
    pub run_id: String,
    pub pipeline_id: String,
    pub node_id: String,
    pub seq: u64,
}

/// `timing` field: wall and CPU time captured by the executor's stopwatch (§4.J).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timing {
    pub started_at: String,
    pub finished_at: String,
    pub wall_ms: f64,
    pub cpu_ms: f64,
}

/// `processor` field: the symbol that was resolved and the parameters bound for this node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorRef {
    #[serde(rename = "ref")]
    pub reference: String,
    pub parameters: Value,
}

/// `context_delta` field (§6): the keys this step read, created, and updated, with the
/// `_keys`-suffixed naming convention the SER vocabulary requires (§4.L).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextDelta {
    pub read_keys: Vec<String>,
    pub created_keys: Vec<String>,
    pub updated_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key_summaries: BTreeMap<String, Value>,
}

/// `assertions` field: pre/postcondition check results plus the run metadata attached via
/// `setRunMetadata` (§4.J).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assertions {
    pub preconditions: Vec<CheckResult>,
    pub postconditions: Vec<CheckResult>,
    #[serde(default)]
    pub args: BTreeMap<String, Value>,
}

/// `error` field, present only on `status="error"` records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub stack_digest: String,
}

/// One-per-node provenance artefact (§4.L, §6). The `record_type` discriminant is always
/// `"ser"`; it is carried as a literal field (rather than folded into an outer enum) so the
/// struct round-trips to exactly the documented wire layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerRecord {
    pub record_type: SerRecordType,
    pub identity: SerIdentity,
    pub timestamp: String,
    pub timing: Timing,
    pub processor: ProcessorRef,
    pub status: RunStatus,
    pub context_delta: ContextDelta,
    pub assertions: Assertions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SerError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerRecordType {
    #[serde(rename = "ser")]
    Ser,
}
