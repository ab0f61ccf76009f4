use serde_json::Value;

use crate::metadata::ProcessorMetadata;
use crate::traits::{ContextProcessor, DataOperation, DataProbe, DataSink, DataSource, PayloadSink, PayloadSource};

/// Wraps a `DataSource`; the node's output type is the source's declared output type.
pub struct DataSourceNode {
    pub source: Box<dyn DataSource>,
}

/// Wraps a `PayloadSource`; additionally declares the context keys it injects at the start of a
/// run.
pub struct PayloadSourceNode {
    pub source: Box<dyn PayloadSource>,
    pub injected_context_keys: Vec<String>,
}

/// Wraps a `DataSink`. Passthrough: input type == output type, no context writes.
pub struct DataSinkNode {
    pub sink: Box<dyn DataSink>,
}

/// Wraps a `PayloadSink`. Passthrough on data; reads context but never writes it.
pub struct PayloadSinkNode {
    pub sink: Box<dyn PayloadSink>,
}

/// Wraps a `DataOperation`. Input/output types come from the operation's metadata; context
/// writes are whatever keys the operation declares it may create.
pub struct DataOperationNode {
    pub operation: Box<dyn DataOperation>,
    pub created_keys: Vec<String>,
}

/// Wraps a `DataProbe` and injects its observation into a single named context key each run.
pub struct ProbeContextInjectorNode {
    pub probe: Box<dyn DataProbe>,
    pub context_keyword: String,
}

/// Wraps a `DataProbe` and accumulates its observation into an in-node list rather than writing
/// context. Used when a probe rides over a `DataCollection` (via the `slice:` resolver) and the
/// caller wants every element's observation, not just the last.
pub struct ProbeResultCollectorNode {
    pub probe: Box<dyn DataProbe>,
    results: Vec<Value>,
}

impl ProbeResultCollectorNode {
    pub fn new(probe: Box<dyn DataProbe>) -> Self {
        Self {
            probe,
            results: Vec::new(),
        }
    }

    pub fn push_result(&mut self, value: Value) {
        self.results.push(value);
    }

    pub fn results(&self) -> &[Value] {
        &self.results
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }
}

/// Wraps a `DataOperation` whose output is treated as a probe value: the operation runs, its
/// result is written to a context key, and the node's own output data passes through unchanged.
pub struct DataOperationContextInjectorProbe {
    pub operation: Box<dyn DataOperation>,
    pub context_keyword: String,
}

/// A processor (operation or probe) that reads one context key and writes its result to
/// another, leaving data untouched. Bridges context-to-context transforms that don't fit
/// `ContextProcessor`'s no-data-involved contract.
pub enum ContextDataProcessorKind {
    Operation(Box<dyn DataOperation>),
    Probe(Box<dyn DataProbe>),
}

pub struct ContextDataProcessorNode {
    pub processor: ContextDataProcessorKind,
    pub input_context_key: String,
    pub output_context_key: String,
}

/// Wraps a `ContextProcessor`. Passthrough on data; context keys are whatever the processor
/// declares as required/created/suppressed.
pub struct ContextProcessorNode {
    pub processor: Box<dyn ContextProcessor>,
}

/// A single vertex in a pipeline graph: one processor, generalised to a uniform input/output
/// contract the static inspector (§4.I) and the step executor (§4.J) can both reason about
/// without knowing which processor family sits behind it.
pub enum Node {
    DataSource(DataSourceNode),
    PayloadSource(PayloadSourceNode),
    DataSink(DataSinkNode),
    PayloadSink(PayloadSinkNode),
    DataOperation(DataOperationNode),
    ProbeContextInjector(ProbeContextInjectorNode),
    ProbeResultCollector(ProbeResultCollectorNode),
    DataOperationContextInjectorProbe(DataOperationContextInjectorProbe),
    ContextDataProcessor(ContextDataProcessorNode),
    ContextProcessor(ContextProcessorNode),
}

impl Node {
    /// The processor metadata behind this node, whichever family it wraps.
    pub fn metadata(&self) -> ProcessorMetadata {
        match self {
            Node::DataSource(n) => n.source.metadata(),
            Node::PayloadSource(n) => n.source.metadata(),
            Node::DataSink(n) => n.sink.metadata(),
            Node::PayloadSink(n) => n.sink.metadata(),
            Node::DataOperation(n) => n.operation.metadata(),
            Node::ProbeContextInjector(n) => n.probe.metadata(),
            Node::ProbeResultCollector(n) => n.probe.metadata(),
            Node::DataOperationContextInjectorProbe(n) => n.operation.metadata(),
            Node::ContextDataProcessor(n) => match &n.processor {
                ContextDataProcessorKind::Operation(op) => op.metadata(),
                ContextDataProcessorKind::Probe(p) => p.metadata(),
            },
            Node::ContextProcessor(n) => n.processor.metadata(),
        }
    }

    /// The declared input data type, or `None` for a node that originates data (a source).
    pub fn input_data_type(&self) -> Option<String> {
        self.metadata().input_data_type
    }

    /// The declared output data type, or `None` for a node that terminates data (a sink).
    pub fn output_data_type(&self) -> Option<String> {
        self.metadata().output_data_type
    }

    /// Context keys this node may write during a run (§4.C "context writes" column).
    pub fn context_writes(&self) -> Vec<String> {
        match self {
            Node::PayloadSource(n) => n.injected_context_keys.clone(),
            Node::DataOperation(n) => n.created_keys.clone(),
            Node::ProbeContextInjector(n) => vec![n.context_keyword.clone()],
            Node::DataOperationContextInjectorProbe(n) => vec![n.context_keyword.clone()],
            Node::ContextDataProcessor(n) => vec![n.output_context_key.clone()],
            Node::ContextProcessor(n) => n.processor.created_keys(),
            Node::DataSource(_)
            | Node::DataSink(_)
            | Node::PayloadSink(_)
            | Node::ProbeResultCollector(_) => Vec::new(),
        }
    }

    /// Context keys this node reads before it can run.
    pub fn context_reads(&self) -> Vec<String> {
        match self {
            Node::ContextDataProcessor(n) => vec![n.input_context_key.clone()],
            Node::ContextProcessor(n) => n.processor.required_keys(),
            _ => Vec::new(),
        }
    }

    pub fn class_name(&self) -> String {
        self.metadata().class_name
    }
}
