use std::sync::RwLock;

use semantiva_processors::ProcessorInstance;

use crate::error::Result;
use crate::resolvers::{DeleteResolver, RenameResolver, TemplateResolver};
use crate::slice::SliceResolver;

/// A built-in or extension-supplied prefix resolver (§4.D). Each resolver owns one prefix (the
/// text before the first `:`) and is handed everything after it, plus a callback to resolve a
/// nested symbol recursively (used by `slice:`).
pub trait NameResolver: Send + Sync {
    fn prefix(&self) -> &'static str;
    fn resolve(
        &self,
        rest: &str,
        resolve_symbol: &dyn Fn(&str) -> Result<ProcessorInstance>,
    ) -> Result<ProcessorInstance>;
}

/// Ordered prefix → resolver map (§4.D). Order matters only in that the first resolver whose
/// prefix matches wins; built-ins never collide on prefix so in practice only extension
/// resolvers registered under a duplicate prefix are shadowed.
pub struct NameResolverRegistry {
    resolvers: RwLock<Vec<Box<dyn NameResolver>>>,
}

impl NameResolverRegistry {
    pub fn with_builtins() -> Self {
        let registry = Self {
            resolvers: RwLock::new(Vec::new()),
        };
        registry.register(Box::new(RenameResolver));
        registry.register(Box::new(DeleteResolver));
        registry.register(Box::new(TemplateResolver));
        registry.register(Box::new(SliceResolver));
        registry
    }

    pub fn empty() -> Self {
        Self {
            resolvers: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, resolver: Box<dyn NameResolver>) {
        self.resolvers
            .write()
            .expect("name resolver registry lock poisoned")
            .push(resolver);
    }

    /// Returns `Some(result)` if a registered resolver claims `symbol`'s prefix, `None` if no
    /// resolver recognises it (falling through to a plain registry lookup).
    pub fn try_resolve(
        &self,
        symbol: &str,
        resolve_symbol: &dyn Fn(&str) -> Result<ProcessorInstance>,
    ) -> Option<Result<ProcessorInstance>> {
        let (prefix, rest) = symbol.split_once(':')?;
        let resolvers = self.resolvers.read().expect("name resolver registry lock poisoned");
        resolvers
            .iter()
            .find(|r| r.prefix() == prefix)
            .map(|r| r.resolve(rest, resolve_symbol))
    }
}

impl Default for NameResolverRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
