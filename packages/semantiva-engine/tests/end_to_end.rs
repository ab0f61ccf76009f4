//! Black-box end-to-end scenarios (SPEC_FULL.md §8), mirroring
//! `codegraph-orchestration/tests/test_end_to_end_incremental.rs`'s style of driving the whole
//! stack through its public API rather than poking at internals.

use std::sync::Mutex;

use indexmap::IndexMap;
use serde_json::json;

use semantiva_config::{ParameterSweepDirective, ParametricSweepFactory, RangeSpec, Scale, SweepMode, VarSpec};
use semantiva_engine::{
    compute_spec_id, expand_run_space, CombineMode, EngineError, FanoutMode, FanoutSpec, PipelineExecutor,
    RunSpaceExecContext, RunSpaceSpec,
};
use semantiva_processors::{
    ComponentType, ContextObserver, ContextProcessor, ContextProcessorNode, DataOperation, DataOperationNode,
    DataSink, DataSinkNode, DataSource, DataSourceNode, Node, ParamMap, ProcessorInstance, ProcessorMetadata,
};
use semantiva_trace::{
    CheckOutcome, NullTraceDriver, PipelineEnd, PipelineStart, RunSpaceEnd, RunSpaceStart, RunStatus, SerRecord,
    TraceDriver,
};
use semantiva_types::{Context, ContextCarrier, ContextCollection, DataValue, ParameterInfo, Payload, ScalarValue, TypeHierarchy};

/// Captures every SER/lifecycle record emitted during a run, for assertions the tests make on
/// sequencing and status rather than on engine internals directly.
#[derive(Default)]
struct RecordingDriver {
    events: Vec<SerRecord>,
}

impl TraceDriver for RecordingDriver {
    fn on_run_space_start(&mut self, _record: &RunSpaceStart) -> semantiva_trace::Result<()> {
        Ok(())
    }
    fn on_run_space_end(&mut self, _record: &RunSpaceEnd) -> semantiva_trace::Result<()> {
        Ok(())
    }
    fn on_pipeline_start(&mut self, _record: &PipelineStart) -> semantiva_trace::Result<()> {
        Ok(())
    }
    fn on_node_event(&mut self, record: &SerRecord) -> semantiva_trace::Result<()> {
        self.events.push(record.clone());
        Ok(())
    }
    fn on_pipeline_end(&mut self, _record: &PipelineEnd) -> semantiva_trace::Result<()> {
        Ok(())
    }
    fn flush(&mut self) -> semantiva_trace::Result<()> {
        Ok(())
    }
    fn close(&mut self) -> semantiva_trace::Result<()> {
        Ok(())
    }
}

struct ConstantSource(f64);
impl DataSource for ConstantSource {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("ConstantSource", ComponentType::DataSource).with_output_type("NumberValue")
    }
    fn produce(&self, _params: &ParamMap) -> semantiva_processors::Result<DataValue> {
        Ok(DataValue::Scalar(ScalarValue::Number(self.0)))
    }
}

struct Multiply;
impl DataOperation for Multiply {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("Multiply", ComponentType::DataOperation)
            .with_input_type("NumberValue")
            .with_output_type("NumberValue")
            .with_parameter("factor", ParameterInfo::required("f64"))
    }
    fn process(
        &self,
        input: DataValue,
        params: &ParamMap,
        _observer: &mut dyn ContextObserver,
    ) -> semantiva_processors::Result<DataValue> {
        let factor = params.get("factor").and_then(|v| v.as_f64()).unwrap_or(1.0);
        match input {
            DataValue::Scalar(ScalarValue::Number(n)) => Ok(DataValue::Scalar(ScalarValue::Number(n * factor))),
            other => Err(semantiva_processors::ProcessorError::InputTypeMismatch {
                expected: "NumberValue".to_string(),
                actual: other.variant(),
            }),
        }
    }
}

/// Records every value it is asked to consume, so a test can assert the sink received exactly
/// what the upstream operation produced (§8 Scenario 1).
struct RecordingSink(Mutex<Vec<f64>>);
impl DataSink for RecordingSink {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("RecordingSink", ComponentType::DataSink).with_input_type("NumberValue")
    }
    fn consume(&self, data: &DataValue, _params: &ParamMap) -> semantiva_processors::Result<()> {
        if let DataValue::Scalar(ScalarValue::Number(n)) = data {
            self.0.lock().unwrap().push(*n);
        }
        Ok(())
    }
}

/// `DataSink` forwarding to a shared `RecordingSink` so the test can inspect it after the node
/// that owns the boxed trait object has run.
struct SharedSink(std::sync::Arc<RecordingSink>);
impl DataSink for SharedSink {
    fn metadata(&self) -> ProcessorMetadata {
        self.0.metadata()
    }
    fn consume(&self, data: &DataValue, params: &ParamMap) -> semantiva_processors::Result<()> {
        self.0.consume(data, params)
    }
}

#[test]
fn scenario_1_trivial_source_multiply_sink_chain() {
    let sink = std::sync::Arc::new(RecordingSink(Mutex::new(Vec::new())));
    let nodes = vec![
        Node::DataSource(DataSourceNode { source: Box::new(ConstantSource(3.0)) }),
        Node::DataOperation(DataOperationNode { operation: Box::new(Multiply), created_keys: Vec::new() }),
        Node::DataSink(DataSinkNode { sink: Box::new(SharedSink(sink.clone())) }),
    ];
    let configs = vec![
        serde_json::Map::new(),
        serde_json::Map::from_iter([("factor".to_string(), json!(2.0))]),
        serde_json::Map::new(),
    ];
    let mut executor =
        PipelineExecutor::new(nodes, configs, TypeHierarchy::with_builtins(), json!({"nodes": []}));

    let payload = Payload::with_single_context(DataValue::NoData, Context::new());
    let mut driver = RecordingDriver::default();
    let result = executor.execute(payload, &mut driver, None).unwrap();

    match result.data {
        DataValue::Scalar(ScalarValue::Number(n)) => assert_eq!(n, 6.0),
        other => panic!("unexpected output {other:?}"),
    }
    assert_eq!(*sink.0.lock().unwrap(), vec![6.0]);

    assert_eq!(driver.events.len(), 3);
    for (i, event) in driver.events.iter().enumerate() {
        assert_eq!(event.identity.seq, i as u64);
        assert_eq!(event.status, RunStatus::Succeeded);
    }
    let output_checks: Vec<_> = driver.events[1]
        .assertions
        .postconditions
        .iter()
        .filter(|c| c.code == "output_type_ok")
        .collect();
    assert_eq!(output_checks.len(), 1);
}

/// A `ContextProcessor` requiring a context key named `addend`, which is never supplied (§8
/// Scenario 2: the run fails before this body ever executes).
struct AddRequiresAddend;
impl ContextProcessor for AddRequiresAddend {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("Add", ComponentType::ContextProcessor)
    }
    fn required_keys(&self) -> Vec<String> {
        vec!["addend".to_string()]
    }
    fn created_keys(&self) -> Vec<String> {
        Vec::new()
    }
    fn suppressed_keys(&self) -> Vec<String> {
        Vec::new()
    }
    fn process(&self, _params: &ParamMap, _observer: &mut dyn ContextObserver) -> semantiva_processors::Result<()> {
        panic!("Add.process must never run when 'addend' is missing");
    }
}

#[test]
fn scenario_2_missing_context_key_fails_at_runtime() {
    let nodes = vec![
        Node::DataSource(DataSourceNode { source: Box::new(ConstantSource(1.0)) }),
        Node::ContextProcessor(ContextProcessorNode { processor: Box::new(AddRequiresAddend) }),
    ];
    let configs = vec![serde_json::Map::new(), serde_json::Map::new()];
    let mut executor = PipelineExecutor::new(nodes, configs, TypeHierarchy::with_builtins(), json!({"nodes": []}));

    let payload = Payload::with_single_context(DataValue::NoData, Context::new());
    let mut driver = RecordingDriver::default();
    let err = executor.execute(payload, &mut driver, None).unwrap_err();
    assert!(matches!(err, EngineError::Processor(semantiva_processors::ProcessorError::MissingParameter(_))));

    let add_event = driver.events.last().unwrap();
    assert_eq!(add_event.status, RunStatus::Error);
    let error = add_event.error.as_ref().expect("error details recorded on the failing node's SER");
    assert!(error.message.contains("addend"));

    let failed_check = add_event
        .assertions
        .preconditions
        .iter()
        .find(|c| c.code == "required_keys_present")
        .expect("required_keys_present precondition survives the error path");
    assert_eq!(failed_check.result, CheckOutcome::Fail);
    assert_eq!(failed_check.details.get("missing_keys"), Some(&json!(["addend"])));
}

#[test]
fn scenario_3_rename_then_delete_empties_the_context() {
    use semantiva_registry::resolvers::{DeleteProcessor, RenameProcessor};

    let nodes = vec![
        Node::ContextProcessor(ContextProcessorNode {
            processor: Box::new(RenameProcessor { from: "src".to_string(), to: "dst".to_string() }),
        }),
        Node::ContextProcessor(ContextProcessorNode { processor: Box::new(DeleteProcessor { key: "dst".to_string() }) }),
    ];
    let configs = vec![serde_json::Map::new(), serde_json::Map::new()];
    let mut executor = PipelineExecutor::new(nodes, configs, TypeHierarchy::with_builtins(), json!({"nodes": []}));

    let mut context = Context::new();
    context.set("src", json!(7));
    let payload = Payload::with_single_context(DataValue::NoData, context);
    let mut driver = RecordingDriver::default();
    let result = executor.execute(payload, &mut driver, None).unwrap();

    let final_context = result.context.as_single().unwrap();
    assert!(final_context.is_empty());
    for event in &driver.events {
        assert_eq!(event.status, RunStatus::Succeeded);
    }
}

#[test]
fn scenario_3b_template_then_delete_restores_the_pre_state_keys() {
    use semantiva_registry::resolvers::{DeleteProcessor, TemplateProcessor};

    let nodes = vec![
        Node::ContextProcessor(ContextProcessorNode {
            processor: Box::new(TemplateProcessor {
                format: "{x}".to_string(),
                out: "y".to_string(),
                placeholders: vec!["x".to_string()],
            }),
        }),
        Node::ContextProcessor(ContextProcessorNode { processor: Box::new(DeleteProcessor { key: "y".to_string() }) }),
    ];
    let configs = vec![serde_json::Map::new(), serde_json::Map::new()];
    let mut executor = PipelineExecutor::new(nodes, configs, TypeHierarchy::with_builtins(), json!({"nodes": []}));

    let mut context = Context::new();
    context.set("x", json!("value"));
    let payload = Payload::with_single_context(DataValue::NoData, context.clone());
    let mut driver = RecordingDriver::default();
    let result = executor.execute(payload, &mut driver, None).unwrap();

    let final_context = result.context.as_single().unwrap();
    assert_eq!(final_context, &context);
    for event in &driver.events {
        assert_eq!(event.status, RunStatus::Succeeded);
    }
}

/// A `DataSource` over `t` that a parametric sweep drives through `t ∈ linspace(0, 1, 3)` (§8
/// Scenario 4).
struct LinearEchoSource;
impl DataSource for LinearEchoSource {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("LinearEchoSource", ComponentType::DataSource).with_output_type("NumberValue")
    }
    fn produce(&self, params: &ParamMap) -> semantiva_processors::Result<DataValue> {
        let t = params.get("t").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Ok(DataValue::Scalar(ScalarValue::Number(2.0 * t)))
    }
}

#[test]
fn scenario_4_parameter_sweep_produces_a_typed_collection() {
    let mut parameters = IndexMap::new();
    parameters.insert("t".to_string(), "t".to_string());
    let mut variables = IndexMap::new();
    variables.insert(
        "t".to_string(),
        VarSpec::Range(RangeSpec { lo: 0.0, hi: 1.0, steps: 3, scale: Scale::Linear, endpoint: true }),
    );
    let directive = ParameterSweepDirective {
        parameters,
        variables,
        mode: SweepMode::Combinatorial,
        broadcast: false,
        collection: Some("NumberCollection".to_string()),
    };
    let instance =
        ParametricSweepFactory::build(directive, ProcessorInstance::DataSource(Box::new(LinearEchoSource))).unwrap();
    let operation = match instance {
        ProcessorInstance::DataOperation(op) => op,
        _ => panic!("expected a generated DataOperation"),
    };

    let nodes = vec![Node::DataOperation(DataOperationNode { operation, created_keys: vec!["t_values".to_string()] })];
    let configs = vec![serde_json::Map::new()];
    let mut executor = PipelineExecutor::new(nodes, configs, TypeHierarchy::with_builtins(), json!({"nodes": []}));

    let payload = Payload::with_single_context(DataValue::NoData, Context::new());
    let mut driver = NullTraceDriver;
    let result = executor.execute(payload, &mut driver, None).unwrap();

    match result.data {
        DataValue::Collection(collection) => {
            assert_eq!(collection.len(), 3);
            let values: Vec<f64> = collection
                .iter()
                .map(|v| match v {
                    DataValue::Scalar(ScalarValue::Number(n)) => *n,
                    other => panic!("unexpected element {other:?}"),
                })
                .collect();
            assert_eq!(values, vec![0.0, 1.0, 2.0]);
        }
        other => panic!("unexpected output {other:?}"),
    }

    let t_values = result.context.as_single().unwrap().get("t_values").unwrap();
    assert_eq!(t_values, &json!([0.0, 0.5, 1.0]));
}

#[test]
fn scenario_5_run_space_product_of_two_blocks_yields_six_runs() {
    let mut a = IndexMap::new();
    a.insert("n".to_string(), vec![json!(1), json!(2), json!(3)]);
    let mut b = IndexMap::new();
    b.insert("letter".to_string(), vec![json!("x"), json!("y")]);
    let spec = RunSpaceSpec {
        blocks: vec![
            FanoutSpec { mode: Some(FanoutMode::MultiZip), columns: Some(a), ..Default::default() },
            FanoutSpec { mode: Some(FanoutMode::MultiZip), columns: Some(b), ..Default::default() },
        ],
        combine: CombineMode::Product,
        max_runs: 10,
    };
    let (runs, _metas, _inputs_id) = expand_run_space(&spec, std::path::Path::new(".")).unwrap();
    assert_eq!(runs.len(), 6);
    assert_eq!(compute_spec_id(&spec), compute_spec_id(&spec));

    let nodes = vec![Node::DataSource(DataSourceNode { source: Box::new(ConstantSource(1.0)) })];
    let configs = vec![serde_json::Map::new()];
    let mut executor = PipelineExecutor::new(nodes, configs, TypeHierarchy::with_builtins(), json!({"nodes": []}));

    let launch_id = semantiva_engine::fresh_launch_id();
    let mut succeeded = 0usize;
    for (i, run) in runs.iter().enumerate() {
        let context = Context::from_map(run.context.clone());
        let payload = Payload::with_single_context(DataValue::NoData, context);
        let run_ctx = RunSpaceExecContext {
            run_space_launch_id: launch_id.clone(),
            run_space_attempt: 1,
            run_space_index: i,
        };
        let mut driver = NullTraceDriver;
        executor.execute(payload, &mut driver, Some(run_ctx)).unwrap();
        succeeded += 1;
    }

    assert_eq!(succeeded, 6);
}

/// A `ContextProcessor` requiring `k`, which is present in both the global context and an item
/// context of a `ContextCollection` — a fragile overlap the engine must reject before this body
/// ever runs (§8 Scenario 6).
struct RequiresK;
impl ContextProcessor for RequiresK {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("RequiresK", ComponentType::ContextProcessor)
    }
    fn required_keys(&self) -> Vec<String> {
        vec!["k".to_string()]
    }
    fn created_keys(&self) -> Vec<String> {
        Vec::new()
    }
    fn suppressed_keys(&self) -> Vec<String> {
        Vec::new()
    }
    fn process(&self, _params: &ParamMap, _observer: &mut dyn ContextObserver) -> semantiva_processors::Result<()> {
        panic!("RequiresK.process must never run when 'k' is a fragile overlap");
    }
}

#[test]
fn scenario_6_context_collection_fragile_overlap_never_reaches_the_node_body() {
    let mut global = Context::new();
    global.set("k", json!("g"));
    let mut item0 = Context::new();
    item0.set("k", json!("i"));
    let collection = ContextCollection::new(global, vec![item0]);

    let nodes = vec![Node::ContextProcessor(ContextProcessorNode { processor: Box::new(RequiresK) })];
    let configs = vec![serde_json::Map::new()];
    let mut executor = PipelineExecutor::new(nodes, configs, TypeHierarchy::with_builtins(), json!({"nodes": []}));

    let payload = Payload::new(DataValue::NoData, ContextCarrier::Collection(collection));
    let mut driver = NullTraceDriver;
    let err = executor.execute(payload, &mut driver, None).unwrap_err();
    assert!(matches!(err, EngineError::Types(semantiva_types::TypesError::FragileOverlap { .. })));
}
