//! Processor taxonomy and pipeline node wrappers (SPEC_FULL.md §4.B, §4.C).
//!
//! Every processor a pipeline document can reference implements one of the five traits in
//! [`traits`]; [`node::Node`] wraps a boxed processor into a graph vertex with a uniform
//! input/output/context contract that the registry, config, contracts, and engine crates can
//! all reason about without downcasting.

pub mod error;
pub mod instance;
pub mod metadata;
pub mod node;
pub mod traits;

pub use error::{ProcessorError, Result};
pub use instance::{ProcessorFactory, ProcessorInstance};
pub use metadata::{ComponentType, ProcessorMetadata};
pub use node::{
    ContextDataProcessorKind, ContextDataProcessorNode, ContextProcessorNode, DataOperationContextInjectorProbe,
    DataOperationNode, DataSinkNode, DataSourceNode, Node, PayloadSinkNode, PayloadSourceNode,
    ProbeContextInjectorNode, ProbeResultCollectorNode,
};
pub use traits::{
    ContextObserver, ContextProcessor, DataOperation, DataProbe, DataSink, DataSource, ParamMap, PayloadSink,
    PayloadSource,
};
