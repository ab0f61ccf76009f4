//! Semantic identifiers, SER record assembly, trace drivers, and the completeness aggregator
//! (SPEC_FULL.md §4.L).

pub mod aggregation;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod lifecycle;
pub mod record;
pub mod semantic_id;

pub use aggregation::TraceAggregator;
pub use driver::{NullTraceDriver, TraceDriver};
pub use drivers::JsonlTraceDriver;
pub use error::{Result, TraceError};
pub use lifecycle::{PipelineEnd, PipelineStart, RunSpaceEnd, RunSpaceStart};
pub use record::{
    Assertions, CheckOutcome, CheckResult, ContextDelta, ProcessorRef, RunStatus, SerError, SerIdentity, SerRecord,
    SerRecordType, Timing,
};
pub use semantic_id::{canonicalise, hash_canonical, node_semantic_id, pipeline_config_id, pipeline_semantic_id, NodeIdentity};
