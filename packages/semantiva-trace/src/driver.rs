use serde_json::Value;

use crate::error::Result;
use crate::lifecycle::{PipelineEnd, PipelineStart, RunSpaceEnd, RunSpaceStart};
use crate::record::SerRecord;

/// Sink for trace records emitted by the execution engine (§4.L).
///
/// One method per lifecycle event rather than a single dispatch call; Rust has no implicit
/// `self` mutability so every hook takes `&mut self`.
pub trait TraceDriver {
    fn on_run_space_start(&mut self, record: &RunSpaceStart) -> Result<()>;
    fn on_run_space_end(&mut self, record: &RunSpaceEnd) -> Result<()>;
    fn on_pipeline_start(&mut self, record: &PipelineStart) -> Result<()>;
    fn on_node_event(&mut self, record: &SerRecord) -> Result<()>;
    fn on_pipeline_end(&mut self, record: &PipelineEnd) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// A driver that discards every record. Used for `--trace-driver none` and in tests.
#[derive(Debug, Default)]
pub struct NullTraceDriver;

impl TraceDriver for NullTraceDriver {
    fn on_run_space_start(&mut self, _record: &RunSpaceStart) -> Result<()> {
        Ok(())
    }
    fn on_run_space_end(&mut self, _record: &RunSpaceEnd) -> Result<()> {
        Ok(())
    }
    fn on_pipeline_start(&mut self, _record: &PipelineStart) -> Result<()> {
        Ok(())
    }
    fn on_node_event(&mut self, _record: &SerRecord) -> Result<()> {
        Ok(())
    }
    fn on_pipeline_end(&mut self, _record: &PipelineEnd) -> Result<()> {
        Ok(())
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Convenience used only by `NullTraceDriver`'s tests and by drivers that want a generic
/// `record_type -> Value` view before writing (e.g. a JSONL line).
pub(crate) fn to_value<T: serde::Serialize>(record: &T) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}
