use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use semantiva_config::resolve_runtime_value;
use semantiva_processors::{
    ContextDataProcessorKind, ContextObserver as _, ContextProcessor as _, DataOperation as _, DataProbe as _,
    DataSink as _, DataSource as _, Node, PayloadSink as _, PayloadSource as _,
};
use semantiva_trace::{
    node_semantic_id, pipeline_config_id, pipeline_semantic_id, Assertions, CheckResult, ContextDelta, NodeIdentity,
    PipelineEnd, PipelineEndType, PipelineStart, PipelineStartType, ProcessorRef, RunStatus, SerError, SerIdentity,
    SerRecord, SerRecordType, Timing, TraceDriver,
};
use semantiva_types::{Context, ContextCarrier, DataValue, Payload, TypeHierarchy};

use crate::error::{EngineError, Result};
use crate::inspection::{build_pipeline_inspection, validate_pipeline};
use crate::observer::ValidatingContextObserver;
use crate::stopwatch::Stopwatch;

fn node_suppressed_keys(node: &Node) -> Vec<String> {
    match node {
        Node::ContextProcessor(n) => n.processor.suppressed_keys(),
        _ => Vec::new(),
    }
}

/// Converts a context value into a `DataValue` so a `ContextDataProcessorNode`'s wrapped
/// operation/probe (which only knows how to process `DataValue`) can run over it. There is no
/// pinned wire representation for "a context value treated as data", so this keeps the
/// `serde_json::Value` intact behind an opaque wrapper rather than guessing a scalar/collection
/// shape that might not round-trip.
fn data_value_from_json(value: Value) -> DataValue {
    DataValue::opaque("JsonValue", value)
}

/// The inverse of [`data_value_from_json`]: unwraps the opaque `JsonValue` payload a
/// context-to-context operation/probe produced, so it can be written back into the context.
fn json_from_data_value(value: &DataValue) -> Result<Value> {
    value.downcast_opaque::<Value>().cloned().ok_or_else(|| {
        EngineError::InvalidContextKey(format!("expected a JsonValue opaque payload, got '{}'", value.variant()))
    })
}

/// Stable, pipeline-lifetime identity for one node: `node_uuid` captures structural position
/// only (never parameter values, since `pipeline_semantic_id` must not depend on them).
struct NodeRuntimeIdentity {
    node_uuid: String,
}

/// Precomputed, run-independent identity for a whole pipeline. Built once in
/// [`PipelineExecutor::new`] and reused across every run of a run-space, since neither the
/// structural nor the configuration identity changes between runs of the same pipeline.
pub struct PipelineIdentity {
    pub pipeline_semantic_id: String,
    pub pipeline_config_id: String,
    node_identities: Vec<NodeRuntimeIdentity>,
}

fn compute_pipeline_identity(nodes: &[Node], node_configs: &[Map<String, Value>]) -> PipelineIdentity {
    let mut node_identities = Vec::with_capacity(nodes.len());
    let mut semantic_nodes = Vec::with_capacity(nodes.len());
    let mut config_pairs = Vec::with_capacity(nodes.len());

    for (index, node) in nodes.iter().enumerate() {
        let metadata = node.metadata();
        let node_uuid = format!("{index:04}-{}", metadata.class_name);
        let config = node_configs.get(index).cloned().unwrap_or_default();
        let semantic_id = node_semantic_id(
            &metadata.class_name,
            metadata.input_data_type.as_deref(),
            metadata.output_data_type.as_deref(),
            &Value::Object(config),
        );

        semantic_nodes.push(NodeIdentity {
            node_uuid: node_uuid.clone(),
            name: metadata.class_name.clone(),
            payload_from: if index == 0 {
                None
            } else {
                Some(format!("{:04}-{}", index - 1, nodes[index - 1].metadata().class_name))
            },
        });
        config_pairs.push((node_uuid.clone(), semantic_id));
        node_identities.push(NodeRuntimeIdentity { node_uuid });
    }

    PipelineIdentity {
        pipeline_semantic_id: pipeline_semantic_id(&semantic_nodes),
        pipeline_config_id: pipeline_config_id(config_pairs),
        node_identities,
    }
}

/// Arbitrary metadata attached once via [`PipelineExecutor::set_run_metadata`]: copied verbatim
/// into the `pipeline_start` record's `meta` field and into every SER's `assertions.args`.
#[derive(Debug, Clone, Default)]
pub struct RunMetadata {
    pub args: BTreeMap<String, Value>,
    pub run_space: Option<Value>,
    pub trace_context: Option<Value>,
}

impl RunMetadata {
    fn as_meta_value(&self) -> Value {
        let mut meta = Map::new();
        meta.insert("args".to_string(), Value::Object(self.args.clone().into_iter().collect()));
        if let Some(run_space) = &self.run_space {
            meta.insert("run_space".to_string(), run_space.clone());
        }
        if let Some(trace_context) = &self.trace_context {
            meta.insert("trace_context".to_string(), trace_context.clone());
        }
        Value::Object(meta)
    }
}

/// Context passed in by a caller driving a run-space expansion: links this run's
/// `pipeline_start`/SER records back to its run-space launch.
#[derive(Debug, Clone)]
pub struct RunSpaceExecContext {
    pub run_space_launch_id: String,
    pub run_space_attempt: u32,
    pub run_space_index: usize,
}

/// The context delta gathered while running one node's body. Precondition/postcondition checks
/// are threaded out through `run_node_body`'s `&mut Vec<CheckResult>` parameters instead of being
/// carried here, so they survive an early `Err` return and still reach the failing node's SER.
struct NodeOutcome {
    context_delta: ContextDelta,
}

/// The synchronous, single-threaded step loop. Owns the pipeline's `Node`s for the duration of
/// their lifetime (`ProbeResultCollectorNode` accumulates state across runs, so a
/// `PipelineExecutor` is built once and run as many times as needed, not rebuilt per run).
pub struct PipelineExecutor {
    nodes: Vec<Node>,
    node_configs: Vec<Map<String, Value>>,
    type_hierarchy: TypeHierarchy,
    identity: PipelineIdentity,
    pipeline_spec_canonical: Value,
    run_metadata: RunMetadata,
}

impl PipelineExecutor {
    pub fn new(
        nodes: Vec<Node>,
        node_configs: Vec<Map<String, Value>>,
        type_hierarchy: TypeHierarchy,
        pipeline_spec_canonical: Value,
    ) -> Self {
        let identity = compute_pipeline_identity(&nodes, &node_configs);
        Self { nodes, node_configs, type_hierarchy, identity, pipeline_spec_canonical, run_metadata: RunMetadata::default() }
    }

    pub fn pipeline_semantic_id(&self) -> &str {
        &self.identity.pipeline_semantic_id
    }

    pub fn pipeline_config_id(&self) -> &str {
        &self.identity.pipeline_config_id
    }

    /// Attaches caller-supplied metadata carried into every record this executor emits from now
    /// on.
    pub fn set_run_metadata(&mut self, run_metadata: RunMetadata) {
        self.run_metadata = run_metadata;
    }

    /// Validates the pipeline statically without executing anything. Exposed so callers (the
    /// CLI's `inspect`/`run --validate`) can fail fast before spending any I/O.
    pub fn validate(&self, externally_driven: bool) -> Result<()> {
        let inspection = build_pipeline_inspection(&self.nodes, &self.node_configs, externally_driven);
        validate_pipeline(&inspection, &self.type_hierarchy)
    }

    /// Runs the pipeline once over `initial_payload`, emitting lifecycle and SER records through
    /// `driver`. On the first node error, emits a `status="error"` SER for the failing node, a
    /// `pipeline_end` summarising the failure, and returns the error: there is no built-in
    /// retry; a caller wanting one supplies a fresh `attempt` on its next call.
    pub fn execute(
        &mut self,
        initial_payload: Payload,
        driver: &mut dyn TraceDriver,
        run_space: Option<RunSpaceExecContext>,
    ) -> Result<Payload> {
        let run_id = Uuid::new_v4().to_string();
        let pipeline_id = self.identity.pipeline_semantic_id.clone();

        driver.on_pipeline_start(&PipelineStart {
            record_type: PipelineStartType::PipelineStart,
            pipeline_id: pipeline_id.clone(),
            run_id: run_id.clone(),
            pipeline_spec_canonical: self.pipeline_spec_canonical.clone(),
            meta: self.run_metadata.as_meta_value(),
            run_space_launch_id: run_space.as_ref().map(|r| r.run_space_launch_id.clone()),
            run_space_attempt: run_space.as_ref().map(|r| r.run_space_attempt),
            run_space_index: run_space.as_ref().map(|r| r.run_space_index),
        })?;

        let mut payload = initial_payload;
        let mut seq: u64 = 0;

        for index in 0..self.nodes.len() {
            match self.execute_node(index, &mut payload, &run_id, &pipeline_id, seq, driver) {
                Ok(()) => {}
                Err(err) => {
                    driver.on_pipeline_end(&PipelineEnd {
                        record_type: PipelineEndType::PipelineEnd,
                        run_id: run_id.clone(),
                        summary: json!({"status": "error", "failed_node_index": index, "message": err.to_string()}),
                    })?;
                    driver.flush()?;
                    return Err(err);
                }
            }
            seq += 1;
        }

        driver.on_pipeline_end(&PipelineEnd {
            record_type: PipelineEndType::PipelineEnd,
            run_id: run_id.clone(),
            summary: json!({"status": "succeeded", "node_count": self.nodes.len()}),
        })?;
        driver.flush()?;

        Ok(payload)
    }

    fn execute_node(
        &mut self,
        index: usize,
        payload: &mut Payload,
        run_id: &str,
        pipeline_id: &str,
        seq: u64,
        driver: &mut dyn TraceDriver,
    ) -> Result<()> {
        let mut stopwatch = Stopwatch::new();
        stopwatch.start();

        let mut preconditions = Vec::new();
        let mut postconditions = Vec::new();
        let result = self.run_node_body(index, payload, &mut preconditions, &mut postconditions);

        stopwatch.stop();
        let node_uuid = self.identity.node_identities[index].node_uuid.clone();

        let timing = Timing {
            started_at: stopwatch.started_at().map(|t| t.to_rfc3339()).unwrap_or_default(),
            finished_at: stopwatch.finished_at().map(|t| t.to_rfc3339()).unwrap_or_default(),
            wall_ms: stopwatch.wall_ms(),
            cpu_ms: stopwatch.cpu_ms(),
        };

        let node_config = self.node_configs.get(index).cloned().unwrap_or_default();
        let class_name = self.nodes[index].class_name();

        match result {
            Ok(outcome) => {
                let assertions = Assertions { preconditions, postconditions, args: self.run_metadata.args.clone() };

                let record = SerRecord {
                    record_type: SerRecordType::Ser,
                    identity: SerIdentity { run_id: run_id.to_string(), pipeline_id: pipeline_id.to_string(), node_id: node_uuid, seq },
                    timestamp: timing.finished_at.clone(),
                    timing,
                    processor: ProcessorRef { reference: class_name, parameters: Value::Object(node_config) },
                    status: RunStatus::Succeeded,
                    context_delta: outcome.context_delta,
                    assertions,
                    error: None,
                };
                driver.on_node_event(&record)?;
                Ok(())
            }
            Err(err) => {
                let assertions = Assertions { preconditions, postconditions, args: self.run_metadata.args.clone() };
                let record = SerRecord {
                    record_type: SerRecordType::Ser,
                    identity: SerIdentity { run_id: run_id.to_string(), pipeline_id: pipeline_id.to_string(), node_id: node_uuid, seq },
                    timestamp: timing.finished_at.clone(),
                    timing,
                    processor: ProcessorRef { reference: class_name, parameters: Value::Object(node_config) },
                    status: RunStatus::Error,
                    context_delta: ContextDelta::default(),
                    assertions,
                    error: Some(SerError {
                        error_type: "EngineError".to_string(),
                        message: err.to_string(),
                        stack_digest: semantiva_trace::hash_canonical(&err.to_string()),
                    }),
                };
                driver.on_node_event(&record)?;
                Err(err)
            }
        }
    }

    fn run_node_body(
        &mut self,
        index: usize,
        payload: &mut Payload,
        preconditions: &mut Vec<CheckResult>,
        postconditions: &mut Vec<CheckResult>,
    ) -> Result<NodeOutcome> {
        let node = &self.nodes[index];
        let metadata = node.metadata();
        let config = self.node_configs[index].clone();

        if let Some(expected_input) = &metadata.input_data_type {
            let actual = payload.data.variant();
            if self.type_hierarchy.is_compatible(&actual, expected_input) {
                preconditions.push(CheckResult::pass("input_type_ok"));
            } else {
                let mut details = BTreeMap::new();
                details.insert("expected".to_string(), json!(expected_input));
                details.insert("actual".to_string(), json!(actual.clone()));
                preconditions.push(CheckResult::fail("input_type_ok", details));
                return Err(EngineError::DataTypeMismatch { expected: expected_input.clone(), actual });
            }
        }

        let required_keys = node.context_reads();
        if !required_keys.is_empty() {
            let mut missing = Vec::new();
            for key in &required_keys {
                if !context_has_key(&payload.context, key)? {
                    missing.push(key.clone());
                }
            }
            if missing.is_empty() {
                preconditions.push(CheckResult::pass("required_keys_present"));
            } else {
                let mut details = BTreeMap::new();
                details.insert("missing_keys".to_string(), json!(missing.clone()));
                preconditions.push(CheckResult::fail("required_keys_present", details));
                return Err(EngineError::Processor(semantiva_processors::ProcessorError::MissingParameter(
                    missing.join(", "),
                )));
            }
        }

        let unknown = semantiva_config::classify_unknown_config_params(&metadata, &config);
        if unknown.is_empty() {
            preconditions.push(CheckResult::pass("config_valid"));
        } else {
            let mut details = BTreeMap::new();
            details.insert(
                "unknown".to_string(),
                json!(unknown.iter().map(|u| u.name.clone()).collect::<Vec<_>>()),
            );
            preconditions.push(CheckResult::fail("config_valid", details));
            return Err(EngineError::PipelineConfigurationError {
                node_index: index,
                reason: format!("unknown configuration parameter(s) at runtime: {unknown:?}"),
            });
        }

        let params = resolve_params(&metadata, &config, &payload.context)?;

        let allowed_writes = node.context_writes();
        let allowed_suppressions = node_suppressed_keys(node);
        let declared_writes = allowed_writes.clone();

        let (new_data, read_keys, created_keys, updated_keys) =
            self.invoke_node(index, payload, &params, allowed_writes, allowed_suppressions)?;

        if let Some(expected_output) = &metadata.output_data_type {
            let actual = new_data.variant();
            if self.type_hierarchy.is_compatible(&actual, expected_output) {
                postconditions.push(CheckResult::pass("output_type_ok"));
            } else {
                let mut details = BTreeMap::new();
                details.insert("expected".to_string(), json!(expected_output));
                details.insert("actual".to_string(), json!(actual.clone()));
                postconditions.push(CheckResult::fail("output_type_ok", details));
                return Err(EngineError::DataTypeMismatch { expected: expected_output.clone(), actual });
            }
        }

        if !declared_writes.is_empty() {
            let realized: Vec<&String> = created_keys.iter().chain(updated_keys.iter()).collect();
            let missing: Vec<String> = declared_writes.iter().filter(|k| !realized.contains(k)).cloned().collect();
            if missing.is_empty() {
                postconditions.push(CheckResult::pass("context_writes_realized"));
            } else {
                let mut details = BTreeMap::new();
                details.insert("missing_keys".to_string(), json!(missing));
                postconditions.push(CheckResult::fail("context_writes_realized", details));
            }
        }

        payload.data = new_data;

        Ok(NodeOutcome {
            context_delta: ContextDelta { read_keys, created_keys, updated_keys, key_summaries: BTreeMap::new() },
        })
    }

    /// Dispatches to the right processor-family call for `node`, returning its output data and
    /// the observer's read/created/updated key lists. The observer only ever sees the *global*
    /// context when the payload carries a `ContextCollection`, except for
    /// `ProbeContextInjectorNode`, which performs genuine elementwise injection when its input is
    /// a `DataCollection` the same length as the items.
    fn invoke_node(
        &mut self,
        index: usize,
        payload: &mut Payload,
        params: &semantiva_processors::ParamMap,
        allowed_writes: Vec<String>,
        allowed_suppressions: Vec<String>,
    ) -> Result<(DataValue, Vec<String>, Vec<String>, Vec<String>)> {
        let input_data = payload.data.clone();

        if let Node::ProbeContextInjector(n) = &self.nodes[index] {
            if let (ContextCarrier::Collection(collection), DataValue::Collection(items)) =
                (&mut payload.context, &input_data)
            {
                if items.len() == collection.len() {
                    for i in 0..items.len() {
                        let element = items.get(i).expect("index within bounds");
                        let observed = n.probe.observe(element, params)?;
                        collection.set_item_value(i, n.context_keyword.clone(), observed)?;
                    }
                    return Ok((input_data, Vec::new(), Vec::new(), vec![n.context_keyword.clone()]));
                }
            }
        }

        if let Node::PayloadSink(n) = &self.nodes[index] {
            let context_ref: &Context = match &payload.context {
                ContextCarrier::Single(ctx) => ctx,
                ContextCarrier::Collection(cc) => cc.global(),
            };
            n.sink.consume_payload(&input_data, context_ref, params)?;
            return Ok((input_data.clone(), Vec::new(), Vec::new(), Vec::new()));
        }

        let global_context: &mut Context = match &mut payload.context {
            ContextCarrier::Single(ctx) => ctx,
            ContextCarrier::Collection(cc) => cc.global_mut(),
        };

        let mut observer = ValidatingContextObserver::new(global_context, allowed_writes, allowed_suppressions);

        let output = match &mut self.nodes[index] {
            Node::DataSource(n) => n.source.produce(params)?,
            Node::PayloadSource(n) => {
                let (data, produced) = n.source.produce_payload(params)?;
                for (key, value) in produced.items() {
                    observer.update_context(&key, value)?;
                }
                data
            }
            Node::DataSink(n) => {
                n.sink.consume(&input_data, params)?;
                input_data.clone()
            }
            Node::PayloadSink(_) => unreachable!("handled above"),
            Node::DataOperation(n) => n.operation.process(input_data.clone(), params, &mut observer)?,
            Node::ProbeContextInjector(n) => {
                let observed = n.probe.observe(&input_data, params)?;
                observer.update_context(&n.context_keyword, observed)?;
                input_data.clone()
            }
            Node::ProbeResultCollector(n) => {
                let observed = n.probe.observe(&input_data, params)?;
                n.push_result(observed);
                input_data.clone()
            }
            Node::DataOperationContextInjectorProbe(n) => {
                let result = n.operation.process(input_data.clone(), params, &mut observer)?;
                let observed = json_from_data_value(&result)?;
                observer.update_context(&n.context_keyword, observed)?;
                input_data.clone()
            }
            Node::ContextDataProcessor(n) => {
                let value = observer
                    .get_context(&n.input_context_key)
                    .ok_or_else(|| EngineError::InvalidContextKey(n.input_context_key.clone()))?;
                let as_data = data_value_from_json(value);
                let result = match &n.processor {
                    ContextDataProcessorKind::Operation(op) => op.process(as_data, params, &mut observer)?,
                    ContextDataProcessorKind::Probe(p) => data_value_from_json(p.observe(&as_data, params)?),
                };
                let as_json = json_from_data_value(&result)?;
                observer.update_context(&n.output_context_key, as_json)?;
                input_data.clone()
            }
            Node::ContextProcessor(n) => {
                n.processor.process(params, &mut observer)?;
                input_data.clone()
            }
        };

        let read_keys = observer.read_keys();
        let created_keys = observer.created_keys().to_vec();
        let updated_keys = observer.updated_keys().to_vec();

        Ok((output, read_keys, created_keys, updated_keys))
    }
}

/// Whether `key` is readable for a required-context-key precondition check. For a
/// `ContextCollection`-carried payload this goes through [`ContextCollection::get`] rather than a
/// bare presence check, so a key present in both the global context and an item surfaces as
/// `FragileOverlap` here — before the node body ever runs (§8 Scenario 6) — instead of being
/// silently treated as present.
fn context_has_key(carrier: &ContextCarrier, key: &str) -> Result<bool> {
    match carrier {
        ContextCarrier::Single(ctx) => Ok(ctx.contains_key(key)),
        ContextCarrier::Collection(cc) => Ok(cc.get(key)?.is_some()),
    }
}

fn context_snapshot(carrier: &ContextCarrier) -> Context {
    match carrier {
        ContextCarrier::Single(ctx) => ctx.clone(),
        ContextCarrier::Collection(cc) => cc.global().clone(),
    }
}

fn resolve_params(
    metadata: &semantiva_processors::ProcessorMetadata,
    config: &Map<String, Value>,
    context: &ContextCarrier,
) -> Result<semantiva_processors::ParamMap> {
    let snapshot = context_snapshot(context);
    let mut params = semantiva_processors::ParamMap::new();
    for name in metadata.parameters.keys() {
        let value = resolve_runtime_value(name, metadata, config, &snapshot)?;
        params.insert(name.clone(), value);
    }
    Ok(params)
}
