use semantiva_processors::{
    ComponentType, ContextObserver, DataOperation, DataProbe, DataValue, ParamMap, ProcessorError,
    ProcessorInstance, ProcessorMetadata,
};
use semantiva_types::DataCollection;
use serde_json::Value;

use crate::error::{RegistryError, Result};
use crate::name_resolver::NameResolver;

/// Wraps a `DataOperation` so it runs once per element of an incoming `DataCollection`,
/// collecting the per-element outputs back into a collection (§4.D `slice:`, grounded on
/// `SlicingDataProcessorFactory.create`'s `DataOperation` branch).
struct SlicedDataOperation {
    inner: Box<dyn DataOperation>,
    collection_type: String,
}

impl DataOperation for SlicedDataOperation {
    fn metadata(&self) -> ProcessorMetadata {
        let inner = self.inner.metadata();
        ProcessorMetadata::new(
            format!("slice:{}:{}", inner.class_name, self.collection_type),
            ComponentType::DataOperation,
        )
        .with_input_type(self.collection_type.clone())
        .with_output_type(self.collection_type.clone())
    }

    fn process(
        &self,
        input: DataValue,
        params: &ParamMap,
        observer: &mut dyn ContextObserver,
    ) -> semantiva_processors::Result<DataValue> {
        let collection = match input {
            DataValue::Collection(c) => c,
            other => {
                return Err(ProcessorError::InputTypeMismatch {
                    expected: self.collection_type.clone(),
                    actual: other.variant(),
                })
            }
        };

        let mut output_elements = Vec::with_capacity(collection.len());
        for element in collection.iter() {
            let processed = self.inner.process(element.clone(), params, observer)?;
            output_elements.push(processed);
        }
        let out = DataCollection::from_list(output_elements)
            .map_err(|e| ProcessorError::Other(e.to_string()))?;
        Ok(DataValue::Collection(out))
    }
}

/// Wraps a `DataProbe` so it runs once per element, returning the ordered list of observations
/// (§4.D `slice:`, mirroring the `DataProbe` branch of `SlicingDataProcessorFactory.create`).
struct SlicedDataProbe {
    inner: Box<dyn DataProbe>,
    collection_type: String,
}

impl DataProbe for SlicedDataProbe {
    fn metadata(&self) -> ProcessorMetadata {
        let inner = self.inner.metadata();
        ProcessorMetadata::new(
            format!("slice:{}:{}", inner.class_name, self.collection_type),
            ComponentType::DataProbe,
        )
        .with_input_type(self.collection_type.clone())
    }

    fn observe(&self, input: &DataValue, params: &ParamMap) -> semantiva_processors::Result<Value> {
        let collection = match input {
            DataValue::Collection(c) => c,
            other => {
                return Err(ProcessorError::InputTypeMismatch {
                    expected: self.collection_type.clone(),
                    actual: other.variant(),
                })
            }
        };

        let mut observed = Vec::with_capacity(collection.len());
        for element in collection.iter() {
            observed.push(self.inner.observe(element, params)?);
        }
        Ok(Value::Array(observed))
    }
}

pub struct SliceResolver;

impl NameResolver for SliceResolver {
    fn prefix(&self) -> &'static str {
        "slice"
    }

    fn resolve(
        &self,
        rest: &str,
        resolve_symbol: &dyn Fn(&str) -> Result<ProcessorInstance>,
    ) -> Result<ProcessorInstance> {
        let malformed = |reason: &str| RegistryError::MalformedSymbol {
            symbol: format!("slice:{rest}"),
            reason: reason.to_string(),
        };

        let (proc_name, collection_type) = rest
            .split_once(':')
            .ok_or_else(|| malformed("expected slice:PROC:COLLECTION"))?;
        if proc_name.is_empty() || collection_type.is_empty() {
            return Err(malformed("PROC and COLLECTION must both be non-empty"));
        }

        match resolve_symbol(proc_name)? {
            ProcessorInstance::DataOperation(inner) => {
                let inner_meta = inner.metadata();
                if inner_meta.input_data_type != inner_meta.output_data_type {
                    return Err(malformed(
                        "slicing is only supported for operations whose input and output types match",
                    ));
                }
                Ok(ProcessorInstance::DataOperation(Box::new(SlicedDataOperation {
                    inner,
                    collection_type: collection_type.to_string(),
                })))
            }
            ProcessorInstance::DataProbe(inner) => Ok(ProcessorInstance::DataProbe(Box::new(SlicedDataProbe {
                inner,
                collection_type: collection_type.to_string(),
            }))),
            other => Err(malformed(&format!(
                "'{proc_name}' resolves to a {:?}, which cannot be sliced; only DataOperation and DataProbe can",
                other.metadata().component_type
            ))),
        }
    }
}
