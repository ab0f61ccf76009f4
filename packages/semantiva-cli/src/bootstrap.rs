//! Process-wide registry bootstrap shared by every subcommand (§4.D, §4.E).

use std::sync::Arc;

use semantiva_registry::{ExtensionCatalog, ExtensionLoader, NameResolverRegistry, ParameterResolverRegistry, ProcessorRegistry};

use crate::extensions::SemantivaExamplesExtension;

/// The registries every subcommand needs, built once per invocation. `ProcessorRegistry` starts
/// empty; extensions named in the pipeline document are loaded into it before symbol resolution
/// runs.
pub struct Registries {
    pub processors: ProcessorRegistry,
    pub name_resolvers: NameResolverRegistry,
    pub parameter_resolvers: ParameterResolverRegistry,
    pub extension_loader: ExtensionLoader,
}

impl Registries {
    pub fn new() -> Self {
        let catalog = ExtensionCatalog::new();
        catalog.add(Arc::new(SemantivaExamplesExtension));
        Self {
            processors: ProcessorRegistry::new(),
            name_resolvers: NameResolverRegistry::with_builtins(),
            parameter_resolvers: ParameterResolverRegistry::with_builtins(),
            extension_loader: ExtensionLoader::new(catalog),
        }
    }

    pub fn load_extensions(&self, names: &[String]) -> Result<(), semantiva_registry::RegistryError> {
        self.extension_loader.load_extensions(names, &self.processors)
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}
