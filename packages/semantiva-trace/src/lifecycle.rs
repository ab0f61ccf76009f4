use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ record_type: "run_space_start", ... }` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpaceStart {
    pub record_type: RunSpaceStartType,
    pub run_space_launch_id: String,
    pub run_space_attempt: u32,
    pub run_space_spec_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_space_inputs_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_space_planned_run_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_space_input_fingerprints: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunSpaceStartType {
    #[serde(rename = "run_space_start")]
    RunSpaceStart,
}

/// `{ record_type: "run_space_end", ... }` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpaceEnd {
    pub record_type: RunSpaceEndType,
    pub run_space_launch_id: String,
    pub run_space_attempt: u32,
    pub summary: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunSpaceEndType {
    #[serde(rename = "run_space_end")]
    RunSpaceEnd,
}

/// `{ record_type: "pipeline_start", ... }` (§6). Carries the composite FK
/// `(run_space_launch_id, run_space_attempt)`, never `spec_id`/`inputs_id` (those belong only on
/// run-space lifecycle records, per §4.L).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStart {
    pub record_type: PipelineStartType,
    pub pipeline_id: String,
    pub run_id: String,
    pub pipeline_spec_canonical: Value,
    pub meta: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_space_launch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_space_attempt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_space_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStartType {
    #[serde(rename = "pipeline_start")]
    PipelineStart,
}

/// `{ record_type: "pipeline_end", ... }` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEnd {
    pub record_type: PipelineEndType,
    pub run_id: String,
    pub summary: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEndType {
    #[serde(rename = "pipeline_end")]
    PipelineEnd,
}
