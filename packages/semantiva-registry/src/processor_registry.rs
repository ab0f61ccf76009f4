use dashmap::DashMap;

use semantiva_processors::{ProcessorFactory, ProcessorInstance};

use crate::error::{RegistryError, Result};

/// Process-wide `name -> constructor` map (§4.D, §5 "Shared state").
///
/// Write-once in practice: entries are added at bootstrap (built-ins, then extensions) and never
/// mutated afterward. `DashMap` gives concurrent, lock-free reads without a bespoke lock for this
/// "lots of readers, rare writers" map.
#[derive(Default)]
pub struct ProcessorRegistry {
    factories: DashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`, failing if it is already taken. There is no overwrite path: a
    /// pipeline author who shadows a built-in name is almost always a mistake.
    pub fn register(&self, name: impl Into<String>, factory: ProcessorFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn construct(&self, name: &str) -> Option<ProcessorInstance> {
        self.factories.get(name).map(|f| f())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_processors::{ComponentType, DataValue, ParamMap, ProcessorMetadata, ScalarValue};
    use std::sync::Arc;

    struct Answer;
    impl semantiva_processors::DataSource for Answer {
        fn metadata(&self) -> ProcessorMetadata {
            ProcessorMetadata::new("Answer", ComponentType::DataSource).with_output_type("IntegerValue")
        }
        fn produce(&self, _params: &ParamMap) -> semantiva_processors::Result<DataValue> {
            Ok(DataValue::Scalar(ScalarValue::Integer(42)))
        }
    }

    #[test]
    fn register_then_construct_roundtrips() {
        let registry = ProcessorRegistry::new();
        registry
            .register(
                "Answer",
                Arc::new(|| ProcessorInstance::DataSource(Box::new(Answer))),
            )
            .unwrap();
        assert!(registry.contains("Answer"));
        let instance = registry.construct("Answer").unwrap();
        assert_eq!(instance.metadata().class_name, "Answer");
    }

    #[test]
    fn double_registration_is_rejected() {
        let registry = ProcessorRegistry::new();
        let factory: ProcessorFactory = Arc::new(|| ProcessorInstance::DataSource(Box::new(Answer)));
        registry.register("Answer", factory.clone()).unwrap();
        let err = registry.register("Answer", factory).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("Answer".to_string()));
    }

    #[test]
    fn unknown_name_constructs_nothing() {
        let registry = ProcessorRegistry::new();
        assert!(registry.construct("Nope").is_none());
    }
}
