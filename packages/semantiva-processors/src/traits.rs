use std::collections::HashMap;

use serde_json::Value;

use semantiva_types::{Context, DataValue};

use crate::error::Result;
use crate::metadata::ProcessorMetadata;

/// Resolved, ready-to-use parameter values handed to a processor at invocation time.
///
/// Parameter *resolution* (reading `from_context`/`model:`/sweep variables, applying defaults)
/// happens upstream in `semantiva-config`; by the time a processor sees a `ParamMap` every
/// value is already concrete.
pub type ParamMap = HashMap<String, Value>;

/// The mutation surface a `DataOperation` or `ContextProcessor` is given instead of a bare
/// `&mut Context`. `semantiva-engine`'s `ValidatingContextObserver` is the concrete
/// implementation that checks a write against the processor's declared `created`/`suppressed`
/// keys before it lands; processors never touch a `Context` directly.
pub trait ContextObserver {
    fn get_context(&self, key: &str) -> Option<Value>;
    fn update_context(&mut self, key: &str, value: Value) -> Result<()>;
    fn suppress_context(&mut self, key: &str) -> Result<()>;
}

/// Produces a `DataValue` with no input of its own (§4.B). Stateless: `produce` must behave as
/// a pure function of `params`.
pub trait DataSource: Send + Sync {
    fn metadata(&self) -> ProcessorMetadata;
    fn produce(&self, params: &ParamMap) -> Result<DataValue>;
}

/// Like `DataSource`, but also originates the context the run starts from.
pub trait PayloadSource: Send + Sync {
    fn metadata(&self) -> ProcessorMetadata;
    fn produce_payload(&self, params: &ParamMap) -> Result<(DataValue, Context)>;
}

/// Consumes a `DataValue` for effect (writing a file, publishing a message, ...). Stateless and
/// passthrough: the node wrapping a `DataSink` returns its input unchanged.
pub trait DataSink: Send + Sync {
    fn metadata(&self) -> ProcessorMetadata;
    fn consume(&self, data: &DataValue, params: &ParamMap) -> Result<()>;
}

/// Like `DataSink`, but also observes the context alongside the data it consumes.
pub trait PayloadSink: Send + Sync {
    fn metadata(&self) -> ProcessorMetadata;
    fn consume_payload(&self, data: &DataValue, context: &Context, params: &ParamMap) -> Result<()>;
}

/// Transforms one `DataValue` into another, optionally writing context through the bound
/// observer (§4.B). The only processor family allowed to both read data and mutate context in
/// the same step.
pub trait DataOperation: Send + Sync {
    fn metadata(&self) -> ProcessorMetadata;
    fn process(
        &self,
        input: DataValue,
        params: &ParamMap,
        observer: &mut dyn ContextObserver,
    ) -> Result<DataValue>;
}

/// Observes a `DataValue` and reports a value without mutating it or the context directly
/// (§4.B). The node wrapping a probe decides what happens to the observation (inject into a
/// context key, or collect into an in-node list).
pub trait DataProbe: Send + Sync {
    fn metadata(&self) -> ProcessorMetadata;
    fn observe(&self, input: &DataValue, params: &ParamMap) -> Result<Value>;
}

/// Reads and/or writes context keys only; never touches data (§4.B).
pub trait ContextProcessor: Send + Sync {
    fn metadata(&self) -> ProcessorMetadata;
    fn required_keys(&self) -> Vec<String>;
    fn created_keys(&self) -> Vec<String>;
    fn suppressed_keys(&self) -> Vec<String>;
    fn process(&self, params: &ParamMap, observer: &mut dyn ContextObserver) -> Result<()>;
}
