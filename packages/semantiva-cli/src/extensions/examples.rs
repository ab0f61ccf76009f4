//! A small, linked-in demo extension exposing Number-based processors for smoke-testing `run`
//! and `inspect` without a real domain extension installed.
//!
//! Grounded on `semantiva/examples/extension.py`'s `SemantivaExamplesExtension` (a lightweight
//! extension registering processors used throughout Semantiva's own docs and tests); the concrete
//! `test_utils`-style processors it registers are not present in the retrieval pack, so this
//! reimplements the same *kind* of thing (a handful of Number arithmetic/IO processors) rather
//! than translating unavailable source.

use std::sync::Arc;

use semantiva_processors::{
    ComponentType, ContextObserver, DataOperation, DataSource, ParamMap, ProcessorInstance, ProcessorMetadata,
};
use semantiva_registry::{Extension, ProcessorRegistry};
use semantiva_types::{DataValue, ParameterInfo, ScalarValue};

struct NumberConstant;
impl DataSource for NumberConstant {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("NumberConstant", ComponentType::DataSource)
            .with_docstring("Produces a fixed NumberValue from its 'value' parameter.")
            .with_output_type("NumberValue")
            .with_parameter("value", ParameterInfo::with_default("f64", serde_json::json!(0.0)))
    }
    fn produce(&self, params: &ParamMap) -> semantiva_processors::Result<DataValue> {
        let value = params.get("value").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Ok(DataValue::Scalar(ScalarValue::Number(value)))
    }
}

struct NumberAdd;
impl DataOperation for NumberAdd {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("NumberAdd", ComponentType::DataOperation)
            .with_docstring("Adds its 'addend' parameter to a NumberValue.")
            .with_input_type("NumberValue")
            .with_output_type("NumberValue")
            .with_parameter("addend", ParameterInfo::with_default("f64", serde_json::json!(0.0)))
    }
    fn process(
        &self,
        input: DataValue,
        params: &ParamMap,
        _observer: &mut dyn ContextObserver,
    ) -> semantiva_processors::Result<DataValue> {
        let addend = params.get("addend").and_then(|v| v.as_f64()).unwrap_or(0.0);
        match input {
            DataValue::Scalar(ScalarValue::Number(n)) => Ok(DataValue::Scalar(ScalarValue::Number(n + addend))),
            other => Err(semantiva_processors::ProcessorError::InputTypeMismatch {
                expected: "NumberValue".to_string(),
                actual: other.variant(),
            }),
        }
    }
}

struct NumberMultiply;
impl DataOperation for NumberMultiply {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new("NumberMultiply", ComponentType::DataOperation)
            .with_docstring("Multiplies a NumberValue by its 'factor' parameter.")
            .with_input_type("NumberValue")
            .with_output_type("NumberValue")
            .with_parameter("factor", ParameterInfo::with_default("f64", serde_json::json!(1.0)))
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

pub struct SemantivaExamplesExtension;

impl Extension for SemantivaExamplesExtension {
    fn name(&self) -> &str {
        "semantiva-examples"
    }

    fn register(&self, registry: &ProcessorRegistry) -> Result<(), String> {
        registry
            .register("NumberConstant", Arc::new(|| ProcessorInstance::DataSource(Box::new(NumberConstant))))
            .map_err(|e| e.to_string())?;
        registry
            .register("NumberAdd", Arc::new(|| ProcessorInstance::DataOperation(Box::new(NumberAdd))))
            .map_err(|e| e.to_string())?;
        registry
            .register("NumberMultiply", Arc::new(|| ProcessorInstance::DataOperation(Box::new(NumberMultiply))))
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
