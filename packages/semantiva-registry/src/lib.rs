//! Processor registry and symbol resolution (SPEC_FULL.md §4.D, §4.E).
//!
//! `resolve_symbol` is the single entry point every other crate uses to turn a pipeline
//! document's `processor:` string into a constructed [`ProcessorInstance`]: first the name
//! resolvers (`rename:`, `delete:`, `template:`, `slice:`, plus anything an extension adds), then
//! a direct registry lookup, then (Rust having no dynamic module import) a best-effort lookup of
//! the symbol's trailing component.

pub mod error;
pub mod extension;
pub mod name_resolver;
pub mod parameter_resolver;
pub mod processor_registry;
pub mod resolvers;
pub mod slice;

pub use error::{RegistryError, Result};
pub use extension::{Extension, ExtensionCatalog, ExtensionLoader};
pub use name_resolver::{NameResolver, NameResolverRegistry};
pub use parameter_resolver::{FittingModelDescriptor, ModelResolver, ParameterResolverRegistry, ValueResolver};
pub use processor_registry::ProcessorRegistry;
pub use resolvers::{DeleteResolver, RenameResolver, TemplateResolver};
pub use slice::SliceResolver;

use semantiva_processors::ProcessorInstance;

/// `resolveSymbol` (§4.D): (1) consult name resolvers; (2) look up a directly registered class;
/// (3) fall back to the symbol's trailing component (the closest Rust equivalent of "import
/// mod.path and register Class", since there is no dynamic import to perform); otherwise
/// `UnknownProcessor`.
pub fn resolve_symbol(
    symbol: &str,
    processor_registry: &ProcessorRegistry,
    name_resolvers: &NameResolverRegistry,
) -> Result<ProcessorInstance> {
    let recurse = |s: &str| resolve_symbol(s, processor_registry, name_resolvers);

    if let Some(result) = name_resolvers.try_resolve(symbol, &recurse) {
        return result;
    }
    if let Some(instance) = processor_registry.construct(symbol) {
        return Ok(instance);
    }
    if let Some((_, class_name)) = symbol.rsplit_once(':') {
        if let Some(instance) = processor_registry.construct(class_name) {
            return Ok(instance);
        }
    }
    Err(RegistryError::UnknownProcessor(symbol.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_processors::{
        ComponentType, ContextObserver, DataOperation, DataValue, ParamMap, ProcessorMetadata, ScalarValue,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;

    struct RecordingObserver {
        values: HashMap<String, Value>,
        suppressed: Vec<String>,
    }

    impl RecordingObserver {
        fn new() -> Self {
            Self {
                values: HashMap::new(),
                suppressed: Vec::new(),
            }
        }
    }

    impl ContextObserver for RecordingObserver {
        fn get_context(&self, key: &str) -> Option<Value> {
            self.values.get(key).cloned()
        }
        fn update_context(&mut self, key: &str, value: Value) -> semantiva_processors::Result<()> {
            self.values.insert(key.to_string(), value);
            Ok(())
        }
        fn suppress_context(&mut self, key: &str) -> semantiva_processors::Result<()> {
            self.suppressed.push(key.to_string());
            self.values.remove(key);
            Ok(())
        }
    }

    #[test]
    fn rename_resolver_moves_a_context_value() {
        let processor_registry = ProcessorRegistry::new();
        let name_resolvers = NameResolverRegistry::with_builtins();
        let instance = resolve_symbol("rename:raw:clean", &processor_registry, &name_resolvers).unwrap();

        let mut observer = RecordingObserver::new();
        observer.values.insert("raw".to_string(), json!(42));

        match instance {
            ProcessorInstance::ContextProcessor(p) => {
                p.process(&ParamMap::new(), &mut observer).unwrap();
            }
            _ => panic!("expected a ContextProcessor"),
        }
        assert_eq!(observer.get_context("clean"), Some(json!(42)));
        assert_eq!(observer.suppressed, vec!["raw".to_string()]);
    }

    #[test]
    fn template_resolver_formats_placeholders() {
        let processor_registry = ProcessorRegistry::new();
        let name_resolvers = NameResolverRegistry::with_builtins();
        let instance = resolve_symbol(
            "template:\"hello {name}\":greeting",
            &processor_registry,
            &name_resolvers,
        )
        .unwrap();

        let mut observer = RecordingObserver::new();
        observer.values.insert("name".to_string(), json!("ada"));

        match instance {
            ProcessorInstance::ContextProcessor(p) => {
                p.process(&ParamMap::new(), &mut observer).unwrap();
            }
            _ => panic!("expected a ContextProcessor"),
        }
        assert_eq!(observer.get_context("greeting"), Some(json!("hello ada")));
    }

    #[test]
    fn template_resolver_rejects_numeric_placeholder() {
        let processor_registry = ProcessorRegistry::new();
        let name_resolvers = NameResolverRegistry::with_builtins();
        let err = resolve_symbol("template:\"{0}\":out", &processor_registry, &name_resolvers).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedSymbol { .. }));
    }

    struct Doubler;
    impl DataOperation for Doubler {
        fn metadata(&self) -> ProcessorMetadata {
            ProcessorMetadata::new("Doubler", ComponentType::DataOperation)
                .with_input_type("IntegerValue")
                .with_output_type("IntegerValue")
        }
        fn process(
            &self,
            input: DataValue,
            _params: &ParamMap,
            _observer: &mut dyn ContextObserver,
        ) -> semantiva_processors::Result<DataValue> {
            match input {
                DataValue::Scalar(ScalarValue::Integer(n)) => Ok(DataValue::Scalar(ScalarValue::Integer(n * 2))),
                other => Err(semantiva_processors::ProcessorError::InputTypeMismatch {
                    expected: "IntegerValue".to_string(),
                    actual: other.variant(),
                }),
            }
        }
    }

    #[test]
    fn slice_resolver_wraps_a_registered_data_operation() {
        let processor_registry = ProcessorRegistry::new();
        processor_registry
            .register("Doubler", Arc::new(|| ProcessorInstance::DataOperation(Box::new(Doubler))))
            .unwrap();
        let name_resolvers = NameResolverRegistry::with_builtins();

        let instance =
            resolve_symbol("slice:Doubler:IntegerCollection", &processor_registry, &name_resolvers).unwrap();

        let op = match instance {
            ProcessorInstance::DataOperation(op) => op,
            _ => panic!("expected a DataOperation"),
        };

        let collection = semantiva_types::DataCollection::from_list(vec![
            DataValue::Scalar(ScalarValue::Integer(1)),
            DataValue::Scalar(ScalarValue::Integer(2)),
        ])
        .unwrap();

        let mut observer = RecordingObserver::new();
        let out = op
            .process(DataValue::Collection(collection), &ParamMap::new(), &mut observer)
            .unwrap();
        match out {
            DataValue::Collection(c) => assert_eq!(c.len(), 2),
            _ => panic!("expected a collection result"),
        }
    }

    #[test]
    fn unregistered_symbol_is_unknown_processor() {
        let processor_registry = ProcessorRegistry::new();
        let name_resolvers = NameResolverRegistry::with_builtins();
        let err = resolve_symbol("NoSuchThing", &processor_registry, &name_resolvers).unwrap_err();
        assert_eq!(err, RegistryError::UnknownProcessor("NoSuchThing".to_string()));
    }
}
