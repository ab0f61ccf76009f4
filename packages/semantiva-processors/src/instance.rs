use crate::metadata::ProcessorMetadata;
use crate::traits::{ContextProcessor, DataOperation, DataProbe, DataSink, DataSource, PayloadSink, PayloadSource};

/// A concrete processor of any of the seven families, as handed back by symbol resolution
/// (`semantiva-registry`) before it is known which `Node` variant will wrap it.
pub enum ProcessorInstance {
    DataSource(Box<dyn DataSource>),
    PayloadSource(Box<dyn PayloadSource>),
    DataSink(Box<dyn DataSink>),
    PayloadSink(Box<dyn PayloadSink>),
    DataOperation(Box<dyn DataOperation>),
    DataProbe(Box<dyn DataProbe>),
    ContextProcessor(Box<dyn ContextProcessor>),
}

impl ProcessorInstance {
    pub fn metadata(&self) -> ProcessorMetadata {
        match self {
            ProcessorInstance::DataSource(p) => p.metadata(),
            ProcessorInstance::PayloadSource(p) => p.metadata(),
            ProcessorInstance::DataSink(p) => p.metadata(),
            ProcessorInstance::PayloadSink(p) => p.metadata(),
            ProcessorInstance::DataOperation(p) => p.metadata(),
            ProcessorInstance::DataProbe(p) => p.metadata(),
            ProcessorInstance::ContextProcessor(p) => p.metadata(),
        }
    }
}

/// A zero-argument constructor for a registered processor. Processors carry no baked-in
/// configuration (parameters are resolved and passed at invocation time), so construction never
/// fails on missing arguments; it can still fail if a built-in invariant is violated.
pub type ProcessorFactory = std::sync::Arc<dyn Fn() -> ProcessorInstance + Send + Sync>;
