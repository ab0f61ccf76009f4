//! Pipeline inspection, step execution, and fan-out/run-space expansion (SPEC_FULL.md §4.I,
//! §4.J, §4.K).
//!
//! [`build::build_pipeline`] turns a preprocessed, symbol-resolved node list into the `Node`s
//! [`inspection::build_pipeline_inspection`] validates statically; [`executor::PipelineExecutor`]
//! then runs the validated graph one payload at a time, emitting SER and lifecycle records
//! through a `semantiva_trace::TraceDriver`. [`run_space`] produces the sequence of independent
//! runs a fan-out or run-space launch fans out into, each with its own `RunSpaceExecContext`.

pub mod build;
pub mod error;
pub mod executor;
pub mod inspection;
pub mod observer;
pub mod run_space;
pub mod stopwatch;

pub use build::{build_node, build_pipeline};
pub use error::{EngineError, Result};
pub use executor::{PipelineExecutor, PipelineIdentity, RunMetadata, RunSpaceExecContext};
pub use inspection::{build_pipeline_inspection, validate_pipeline, NodeInspection, PipelineInspection};
pub use observer::ValidatingContextObserver;
pub use run_space::{
    compute_spec_id, expand_fanout, expand_run_space, fresh_launch_id, CombineMode, ExpandedRun, FanoutMode,
    FanoutSpec, RunSpaceSpec, SourceMeta,
};
pub use stopwatch::Stopwatch;
