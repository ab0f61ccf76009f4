use std::collections::HashMap;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::error::{RegistryError, Result};
use crate::processor_registry::ProcessorRegistry;

/// A linked-in extension that registers its processors into a `ProcessorRegistry` (§4.E).
///
/// Rust has no runtime module import or entry-point discovery, so an extension is just a value
/// the embedder links in and hands to an `ExtensionCatalog` before calling `load_extensions` —
/// the explicit-registration-step redesign noted in SPEC_FULL.md §4 for "metaclass-based
/// registration" and, here, for Python's dynamic `importlib`/entry-point extension loading.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;
    fn register(&self, registry: &ProcessorRegistry) -> std::result::Result<(), String>;
}

/// The set of extensions an embedder has linked in and made available by name.
#[derive(Default)]
pub struct ExtensionCatalog {
    extensions: DashMap<String, Arc<dyn Extension>>,
}

impl ExtensionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, extension: Arc<dyn Extension>) {
        self.extensions.insert(extension.name().to_string(), extension);
    }
}

/// Loads extensions by name into a `ProcessorRegistry`, idempotently (§4.E).
pub struct ExtensionLoader {
    catalog: ExtensionCatalog,
    loaded: DashSet<String>,
}

impl ExtensionLoader {
    pub fn new(catalog: ExtensionCatalog) -> Self {
        Self {
            catalog,
            loaded: DashSet::new(),
        }
    }

    /// Sorts and deduplicates `names`, then registers each not-yet-loaded extension. Already
    /// loaded names are silently skipped rather than re-registered, since a registry entry
    /// registered twice for the same process would otherwise conflict with itself.
    pub fn load_extensions(&self, names: &[String], registry: &ProcessorRegistry) -> Result<()> {
        let mut sorted: Vec<String> = names.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut failures: HashMap<String, String> = HashMap::new();
        for name in &sorted {
            if self.loaded.contains(name) {
                continue;
            }
            match self.catalog.extensions.get(name) {
                Some(extension) => match extension.register(registry) {
                    Ok(()) => {
                        self.loaded.insert(name.clone());
                    }
                    Err(reason) => {
                        failures.insert(name.clone(), reason);
                    }
                },
                None => {
                    failures.insert(name.clone(), "extension not found in catalog".to_string());
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::ExtensionLoadError(failures))
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_processors::{ComponentType, DataValue, ParamMap, ProcessorInstance, ProcessorMetadata, ScalarValue};

    struct Greeter;
    impl semantiva_processors::DataSource for Greeter {
        fn metadata(&self) -> ProcessorMetadata {
            ProcessorMetadata::new("Greeter", ComponentType::DataSource).with_output_type("TextValue")
        }
        fn produce(&self, _params: &ParamMap) -> semantiva_processors::Result<DataValue> {
            Ok(DataValue::Scalar(ScalarValue::Text("hi".to_string())))
        }
    }

    struct GreetingExtension;
    impl Extension for GreetingExtension {
        fn name(&self) -> &str {
            "greeting"
        }
        fn register(&self, registry: &ProcessorRegistry) -> std::result::Result<(), String> {
            registry
                .register("Greeter", Arc::new(|| ProcessorInstance::DataSource(Box::new(Greeter))))
                .map_err(|e| e.to_string())
        }
    }

    #[test]
    fn loading_twice_is_idempotent() {
        let catalog = ExtensionCatalog::new();
        catalog.add(Arc::new(GreetingExtension));
        let loader = ExtensionLoader::new(catalog);
        let registry = ProcessorRegistry::new();

        loader.load_extensions(&["greeting".to_string()], &registry).unwrap();
        loader.load_extensions(&["greeting".to_string()], &registry).unwrap();
        assert!(registry.contains("Greeter"));
    }

    #[test]
    fn unknown_extension_name_reports_failure() {
        let loader = ExtensionLoader::new(ExtensionCatalog::new());
        let registry = ProcessorRegistry::new();
        let err = loader
            .load_extensions(&["does_not_exist".to_string()], &registry)
            .unwrap_err();
        assert!(matches!(err, RegistryError::ExtensionLoadError(_)));
    }
}
