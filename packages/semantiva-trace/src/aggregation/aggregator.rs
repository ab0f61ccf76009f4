use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::models::{
    CompletenessStatus, LaunchAggregate, LaunchCompleteness, NodeAggregate, RunAggregate, RunCompleteness,
    TERMINAL_STATUSES,
};

fn str_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn coerce_u32(value: Option<&Value>) -> Option<u32> {
    match value {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as u32),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

/// Public API for run-space-aware trace aggregation (§4.L), ported directly from
/// `trace/aggregation/aggregator.py`'s `TraceAggregator`. Ingestion accepts raw JSON records
/// (rather than the typed `SerRecord`/lifecycle structs in the rest of this crate) because
/// tolerance for unknown or malformed record shapes — "tolerate for forward compatibility" (§9)
/// — only makes sense against an untyped representation; a typed enum would have to reject
/// anything it doesn't recognise at the deserialization boundary instead of silently skipping it.
#[derive(Debug, Default)]
pub struct TraceAggregator {
    runs: BTreeMap<String, RunAggregate>,
    launches: BTreeMap<(String, u32), LaunchAggregate>,
}

impl TraceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, record: &Value) {
        match record.get("record_type").and_then(Value::as_str) {
            Some("run_space_start") => self.ingest_run_space_start(record),
            Some("run_space_end") => self.ingest_run_space_end(record),
            Some("pipeline_start") => self.ingest_pipeline_start(record),
            Some("pipeline_end") => self.ingest_pipeline_end(record),
            Some("ser") => self.ingest_ser(record),
            _ => {}
        }
    }

    pub fn ingest_many<'a>(&mut self, records: impl IntoIterator<Item = &'a Value>) {
        for record in records {
            self.ingest(record);
        }
    }

    pub fn get_run(&self, run_id: &str) -> Option<&RunAggregate> {
        self.runs.get(run_id)
    }

    pub fn iter_runs(&self) -> impl Iterator<Item = &RunAggregate> {
        self.runs.values()
    }

    pub fn get_launch(&self, launch_id: &str, attempt: u32) -> Option<&LaunchAggregate> {
        self.launches.get(&(launch_id.to_string(), attempt))
    }

    pub fn iter_launches(&self) -> impl Iterator<Item = &LaunchAggregate> {
        self.launches.values()
    }

    pub fn finalize_run(&mut self, run_id: &str) -> RunCompleteness {
        let Some(run) = self.runs.get_mut(run_id) else {
            return RunCompleteness {
                run_id: run_id.to_string(),
                status: CompletenessStatus::Invalid,
                problems: vec!["unknown_run".to_string()],
                missing_nodes: vec![],
                orphan_nodes: vec![],
                nonterminal_nodes: vec![],
                summary: BTreeMap::new(),
            };
        };

        let expected_nodes = expected_nodes(run.pipeline_spec_canonical.as_ref());
        let observed_nodes: HashSet<String> = run.nodes.keys().cloned().collect();

        if run.start_timestamp.is_none() || run.end_timestamp.is_none() {
            for node in run.nodes.values() {
                if let Some(ts) = &node.first_timestamp {
                    if run.start_timestamp.as_deref().map_or(true, |s| ts.as_str() < s) {
                        run.start_timestamp = Some(ts.clone());
                    }
                }
                if let Some(ts) = &node.last_timestamp {
                    if run.end_timestamp.as_deref().map_or(true, |s| ts.as_str() > s) {
                        run.end_timestamp = Some(ts.clone());
                    }
                }
                if let Some(started_at) = node.timing.get("started_at").and_then(Value::as_str) {
                    if run.start_timestamp.as_deref().map_or(true, |s| started_at < s) {
                        run.start_timestamp = Some(started_at.to_string());
                    }
                }
                if let Some(finished_at) = node.timing.get("finished_at").and_then(Value::as_str) {
                    if run.end_timestamp.as_deref().map_or(true, |s| finished_at > s) {
                        run.end_timestamp = Some(finished_at.to_string());
                    }
                }
            }
        }

        let mut problems = Vec::new();
        if !run.saw_start {
            problems.push("missing_pipeline_start".to_string());
        }
        if !run.saw_end {
            problems.push("missing_pipeline_end".to_string());
        }
        if let (Some(start), Some(end)) = (&run.start_timestamp, &run.end_timestamp) {
            if start > end {
                problems.push("start_time_gt_end_time".to_string());
            }
        }

        let (missing, orphan): (Vec<String>, Vec<String>) = match &expected_nodes {
            Some(expected) => {
                let mut missing: Vec<String> = expected.difference(&observed_nodes).cloned().collect();
                let mut orphan: Vec<String> = observed_nodes.difference(expected).cloned().collect();
                missing.sort();
                orphan.sort();
                (missing, orphan)
            }
            None => (vec![], vec![]),
        };

        let mut nonterminal: Vec<String> = run
            .nodes
            .values()
            .filter(|n| !n.last_status.as_deref().is_some_and(|s| TERMINAL_STATUSES.contains(&s)))
            .map(|n| n.node_id.clone())
            .collect();
        nonterminal.sort();

        let status = if run.saw_start && run.saw_end {
            CompletenessStatus::Complete
        } else if !run.saw_start && !run.saw_end && !observed_nodes.is_empty() {
            CompletenessStatus::Invalid
        } else if run.saw_start || run.saw_end || !observed_nodes.is_empty() {
            CompletenessStatus::Partial
        } else {
            CompletenessStatus::Invalid
        };

        let coverage = expected_nodes.as_ref().map(|expected| {
            let hit = observed_nodes.intersection(expected).count();
            let pct = hit as f64 / expected.len().max(1) as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        });

        let mut summary = BTreeMap::new();
        summary.insert(
            "nodes_total_expected".to_string(),
            expected_nodes.as_ref().map(|e| Value::from(e.len())).unwrap_or(Value::Null),
        );
        summary.insert("nodes_observed".to_string(), Value::from(observed_nodes.len()));
        summary.insert("coverage_pct".to_string(), coverage.map(Value::from).unwrap_or(Value::Null));
        summary.insert("has_start".to_string(), Value::from(run.saw_start));
        summary.insert("has_end".to_string(), Value::from(run.saw_end));

        RunCompleteness {
            run_id: run.run_id.clone(),
            status,
            problems,
            missing_nodes: missing,
            orphan_nodes: orphan,
            nonterminal_nodes: nonterminal,
            summary,
        }
    }

    pub fn finalize_launch(&mut self, launch_id: &str, attempt: u32) -> LaunchCompleteness {
        let key = (launch_id.to_string(), attempt);
        let Some(launch) = self.launches.get(&key).cloned() else {
            return LaunchCompleteness {
                run_space_launch_id: launch_id.to_string(),
                run_space_attempt: attempt,
                status: CompletenessStatus::Invalid,
                problems: vec!["unknown_launch".to_string()],
                summary: BTreeMap::new(),
            };
        };

        let mut problems = Vec::new();
        if !launch.saw_start {
            problems.push("missing_run_space_start".to_string());
        }
        if !launch.saw_end {
            problems.push("missing_run_space_end".to_string());
        }

        let mut run_status_counts: BTreeMap<&'static str, u64> =
            BTreeMap::from([("complete", 0), ("partial", 0), ("invalid", 0)]);
        for run_id in &launch.pipelines {
            let completeness = self.finalize_run(run_id);
            let key = match completeness.status {
                CompletenessStatus::Complete => "complete",
                CompletenessStatus::Partial => "partial",
                CompletenessStatus::Invalid => "invalid",
            };
            *run_status_counts.get_mut(key).unwrap() += 1;
        }

        let status = if !launch.saw_start && !launch.pipelines.is_empty() {
            CompletenessStatus::Invalid
        } else if launch.saw_start && launch.saw_end {
            if run_status_counts["partial"] > 0 || run_status_counts["invalid"] > 0 {
                CompletenessStatus::Partial
            } else {
                CompletenessStatus::Complete
            }
        } else if launch.saw_start || launch.saw_end || !launch.pipelines.is_empty() {
            CompletenessStatus::Partial
        } else {
            CompletenessStatus::Invalid
        };

        let mut summary = BTreeMap::new();
        summary.insert("runs_total".to_string(), Value::from(launch.pipelines.len()));
        summary.insert(
            "runs_by_status".to_string(),
            serde_json::to_value(&run_status_counts).unwrap(),
        );
        summary.insert(
            "planned_run_count".to_string(),
            launch.planned_run_count.map(Value::from).unwrap_or(Value::Null),
        );

        LaunchCompleteness {
            run_space_launch_id: launch.run_space_launch_id,
            run_space_attempt: launch.run_space_attempt,
            status,
            problems,
            summary,
        }
    }

    pub fn finalize_all(&mut self) -> (Vec<RunCompleteness>, Vec<LaunchCompleteness>) {
        let run_ids: Vec<String> = self.runs.keys().cloned().collect();
        let run_results: Vec<RunCompleteness> = run_ids.iter().map(|id| self.finalize_run(id)).collect();
        let launch_keys: Vec<(String, u32)> = self.launches.keys().cloned().collect();
        let launch_results: Vec<LaunchCompleteness> =
            launch_keys.iter().map(|(id, attempt)| self.finalize_launch(id, *attempt)).collect();
        (run_results, launch_results)
    }

    fn ingest_run_space_start(&mut self, record: &Value) {
        let Some(launch_id) = str_field(record, "run_space_launch_id") else { return };
        let Some(attempt) = coerce_u32(record.get("run_space_attempt")) else { return };
        let launch = self
            .launches
            .entry((launch_id.to_string(), attempt))
            .or_insert_with(|| LaunchAggregate::new(launch_id, attempt));
        launch.saw_start = true;
        if let Some(v) = str_field(record, "run_space_spec_id") {
            launch.run_space_spec_id = Some(v.to_string());
        }
        if let Some(v) = str_field(record, "run_space_inputs_id") {
            launch.run_space_inputs_id = Some(v.to_string());
        }
        if let Some(v) = record.get("run_space_planned_run_count").and_then(Value::as_u64) {
            launch.planned_run_count = Some(v as usize);
        }
        if let Some(v) = record.get("run_space_input_fingerprints").and_then(Value::as_array) {
            launch.input_fingerprints = Some(v.clone());
        }
    }

    fn ingest_run_space_end(&mut self, record: &Value) {
        let Some(launch_id) = str_field(record, "run_space_launch_id") else { return };
        let Some(attempt) = coerce_u32(record.get("run_space_attempt")) else { return };
        let launch = self
            .launches
            .entry((launch_id.to_string(), attempt))
            .or_insert_with(|| LaunchAggregate::new(launch_id, attempt));
        launch.saw_end = true;
    }

    fn ingest_pipeline_start(&mut self, record: &Value) {
        let Some(run_id) = str_field(record, "run_id") else { return };
        let run = self.runs.entry(run_id.to_string()).or_insert_with(|| RunAggregate::new(run_id));
        run.saw_start = true;
        if let Some(v) = str_field(record, "pipeline_id") {
            run.pipeline_id = Some(v.to_string());
        }
        if let Some(v) = record.get("pipeline_spec_canonical") {
            if !v.is_null() {
                run.pipeline_spec_canonical = Some(v.clone());
            }
        }
        if let Some(v) = record.get("meta") {
            if !v.is_null() {
                run.meta = Some(v.clone());
            }
        }
        let timestamp = str_field(record, "timestamp")
            .or_else(|| record.get("timing").and_then(|t| t.get("started_at")).and_then(Value::as_str));
        if let Some(ts) = timestamp {
            if run.start_timestamp.as_deref().map_or(true, |s| ts < s) {
                run.start_timestamp = Some(ts.to_string());
            }
        }

        let launch_id = str_field(record, "run_space_launch_id").map(str::to_string);
        let attempt = coerce_u32(record.get("run_space_attempt"));
        if let Some(id) = &launch_id {
            run.run_space_launch_id = Some(id.clone());
        }
        if let Some(a) = attempt {
            run.run_space_attempt = Some(a);
        }
        if let (Some(id), Some(a)) = (launch_id, attempt) {
            let launch = self.launches.entry((id.clone(), a)).or_insert_with(|| LaunchAggregate::new(id, a));
            launch.pipelines.insert(run_id.to_string());
        }
    }

    fn ingest_pipeline_end(&mut self, record: &Value) {
        let Some(run_id) = str_field(record, "run_id") else { return };
        let run = self.runs.entry(run_id.to_string()).or_insert_with(|| RunAggregate::new(run_id));
        run.saw_end = true;
        let timestamp = str_field(record, "timestamp")
            .or_else(|| record.get("timing").and_then(|t| t.get("finished_at")).and_then(Value::as_str));
        if let Some(ts) = timestamp {
            if run.end_timestamp.as_deref().map_or(true, |s| ts > s) {
                run.end_timestamp = Some(ts.to_string());
            }
        }
    }

    fn ingest_ser(&mut self, record: &Value) {
        let identity = record.get("identity");
        let Some(run_id) = identity.and_then(|i| i.get("run_id")).and_then(Value::as_str) else { return };
        let Some(node_id) = identity.and_then(|i| i.get("node_id")).and_then(Value::as_str) else { return };
        let run = self.runs.entry(run_id.to_string()).or_insert_with(|| RunAggregate::new(run_id));
        let node = run.nodes.entry(node_id.to_string()).or_insert_with(|| NodeAggregate::new(node_id));

        let timestamp = str_field(record, "timestamp")
            .or_else(|| record.get("timing").and_then(|t| t.get("started_at")).and_then(Value::as_str));
        if let Some(ts) = timestamp {
            if node.first_timestamp.as_deref().map_or(true, |s| ts < s) {
                node.first_timestamp = Some(ts.to_string());
            }
            if node.last_timestamp.as_deref().map_or(true, |s| ts > s) {
                node.last_timestamp = Some(ts.to_string());
            }
        }
        if let Some(seq) = record.get("seq").and_then(Value::as_u64) {
            node.last_seq = Some(seq);
        }
        let status = str_field(record, "status").unwrap_or("unknown").to_string();
        *node.counts.entry(status.clone()).or_insert(0) += 1;
        node.timing = record
            .get("timing")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        node.last_error = if status == "error" { record.get("error").cloned() } else { None };
        node.last_status = Some(status);
    }
}

fn expected_nodes(spec: Option<&Value>) -> Option<HashSet<String>> {
    let nodes = spec?.get("nodes")?.as_array()?;
    let collected: HashSet<String> = nodes
        .iter()
        .filter_map(|entry| entry.get("node_uuid")).filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    if collected.is_empty() {
        None
    } else {
        Some(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_with_start_and_end_and_no_expected_nodes_is_complete() {
        let mut agg = TraceAggregator::new();
        agg.ingest(&json!({"record_type": "pipeline_start", "run_id": "r1", "timestamp": "2026-01-01T00:00:00Z"}));
        agg.ingest(&json!({"record_type": "pipeline_end", "run_id": "r1", "timestamp": "2026-01-01T00:00:01Z"}));
        let completeness = agg.finalize_run("r1");
        assert_eq!(completeness.status, CompletenessStatus::Complete);
        assert!(completeness.problems.is_empty());
    }

    #[test]
    fn ser_only_run_with_no_lifecycle_records_is_invalid() {
        let mut agg = TraceAggregator::new();
        agg.ingest(&json!({
            "record_type": "ser",
            "identity": {"run_id": "r1", "node_id": "n0"},
            "status": "succeeded",
            "timestamp": "2026-01-01T00:00:00Z",
        }));
        let completeness = agg.finalize_run("r1");
        assert_eq!(completeness.status, CompletenessStatus::Invalid);
    }

    #[test]
    fn unknown_record_types_are_tolerated() {
        let mut agg = TraceAggregator::new();
        agg.ingest(&json!({"record_type": "future_record", "whatever": true}));
        assert_eq!(agg.iter_runs().count(), 0);
    }

    #[test]
    fn missing_and_orphan_nodes_are_detected_against_the_canonical_spec() {
        let mut agg = TraceAggregator::new();
        agg.ingest(&json!({
            "record_type": "pipeline_start",
            "run_id": "r1",
            "pipeline_spec_canonical": {"nodes": [{"node_uuid": "a"}, {"node_uuid": "b"}]},
        }));
        agg.ingest(&json!({
            "record_type": "ser",
            "identity": {"run_id": "r1", "node_id": "a"},
            "status": "succeeded",
        }));
        agg.ingest(&json!({
            "record_type": "ser",
            "identity": {"run_id": "r1", "node_id": "c"},
            "status": "succeeded",
        }));
        agg.ingest(&json!({"record_type": "pipeline_end", "run_id": "r1"}));
        let completeness = agg.finalize_run("r1");
        assert_eq!(completeness.missing_nodes, vec!["b".to_string()]);
        assert_eq!(completeness.orphan_nodes, vec!["c".to_string()]);
    }

    #[test]
    fn launch_is_complete_when_all_its_runs_are_complete() {
        let mut agg = TraceAggregator::new();
        agg.ingest(&json!({"record_type": "run_space_start", "run_space_launch_id": "L", "run_space_attempt": 1}));
        agg.ingest(&json!({"record_type": "pipeline_start", "run_id": "r1", "run_space_launch_id": "L", "run_space_attempt": 1}));
        agg.ingest(&json!({"record_type": "pipeline_end", "run_id": "r1"}));
        agg.ingest(&json!({"record_type": "run_space_end", "run_space_launch_id": "L", "run_space_attempt": 1}));
        let completeness = agg.finalize_launch("L", 1);
        assert_eq!(completeness.status, CompletenessStatus::Complete);
    }
}
