use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

pub const TERMINAL_STATUSES: &[&str] = &["succeeded", "error", "skipped", "cancelled"];

/// Verdict a run or launch can be assigned by the aggregator (§4.L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletenessStatus {
    Complete,
    Partial,
    Invalid,
}

/// Per-node aggregation state captured while ingesting SER records. Mirrors `NodeAggregate` in
/// `trace/aggregation/models.py`.
#[derive(Debug, Clone, Default)]
pub struct NodeAggregate {
    pub node_id: String,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub last_seq: Option<u64>,
    pub last_status: Option<String>,
    pub counts: HashMap<String, u64>,
    pub timing: BTreeMap<String, Value>,
    pub last_error: Option<Value>,
}

impl NodeAggregate {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self { node_id: node_id.into(), ..Default::default() }
    }
}

/// Mutable aggregation state for a single pipeline run. Mirrors `RunAggregate`.
#[derive(Debug, Clone, Default)]
pub struct RunAggregate {
    pub run_id: String,
    pub pipeline_id: Option<String>,
    pub pipeline_spec_canonical: Option<Value>,
    pub meta: Option<Value>,
    pub run_space_launch_id: Option<String>,
    pub run_space_attempt: Option<u32>,
    pub saw_start: bool,
    pub saw_end: bool,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub nodes: BTreeMap<String, NodeAggregate>,
}

impl RunAggregate {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), ..Default::default() }
    }
}

/// Deterministic completeness verdict for a run with supporting details. Mirrors
/// `RunCompleteness`.
#[derive(Debug, Clone, Serialize)]
pub struct RunCompleteness {
    pub run_id: String,
    pub status: CompletenessStatus,
    pub problems: Vec<String>,
    pub missing_nodes: Vec<String>,
    pub orphan_nodes: Vec<String>,
    pub nonterminal_nodes: Vec<String>,
    pub summary: BTreeMap<String, Value>,
}

/// Mutable aggregation state for a run-space launch attempt. Mirrors `LaunchAggregate`.
#[derive(Debug, Clone, Default)]
pub struct LaunchAggregate {
    pub run_space_launch_id: String,
    pub run_space_attempt: u32,
    pub run_space_spec_id: Option<String>,
    pub run_space_inputs_id: Option<String>,
    pub planned_run_count: Option<usize>,
    pub input_fingerprints: Option<Vec<Value>>,
    pub saw_start: bool,
    pub saw_end: bool,
    pub pipelines: HashSet<String>,
}

impl LaunchAggregate {
    pub fn new(run_space_launch_id: impl Into<String>, run_space_attempt: u32) -> Self {
        Self {
            run_space_launch_id: run_space_launch_id.into(),
            run_space_attempt,
            ..Default::default()
        }
    }
}

/// Deterministic completeness verdict for a launch attempt. Mirrors `LaunchCompleteness`.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchCompleteness {
    pub run_space_launch_id: String,
    pub run_space_attempt: u32,
    pub status: CompletenessStatus,
    pub problems: Vec<String>,
    pub summary: BTreeMap<String, Value>,
}
