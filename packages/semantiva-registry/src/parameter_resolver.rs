use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, Result};

/// A resolver that recognises and rewrites scalar configuration values (§4.D). Applied
/// recursively over a whole configuration tree by `ParameterResolverRegistry::resolve_value`.
pub trait ValueResolver: Send + Sync {
    fn can_resolve(&self, value: &str) -> bool;
    fn resolve(&self, value: &str) -> Result<Value>;
}

/// `model:ClassName:k=v,k=v` → a descriptor referencing a `FittingModel` class and its
/// constructor kwargs (§4.D). The class name is resolved later, against the processor registry,
/// by whatever consumes the descriptor (a `DataOperation` that fits a model) — resolution here
/// only parses the symbol, it does not require the class to already be registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingModelDescriptor {
    pub model_class: String,
    pub kwargs: std::collections::BTreeMap<String, Value>,
}

pub struct ModelResolver;

impl ValueResolver for ModelResolver {
    fn can_resolve(&self, value: &str) -> bool {
        value.starts_with("model:")
    }

    fn resolve(&self, value: &str) -> Result<Value> {
        let rest = value.strip_prefix("model:").expect("can_resolve checked the prefix");
        let (model_class, kwargs_str) = match rest.split_once(':') {
            Some((c, k)) => (c, k),
            None => (rest, ""),
        };
        if model_class.is_empty() {
            return Err(RegistryError::MalformedSymbol {
                symbol: value.to_string(),
                reason: "expected model:ClassName[:k=v,...]".to_string(),
            });
        }

        let mut kwargs = std::collections::BTreeMap::new();
        if !kwargs_str.is_empty() {
            for pair in kwargs_str.split(',') {
                let (k, v) = pair.split_once('=').ok_or_else(|| RegistryError::MalformedSymbol {
                    symbol: value.to_string(),
                    reason: format!("malformed kwarg '{pair}', expected k=v"),
                })?;
                kwargs.insert(k.trim().to_string(), parse_scalar(v.trim()));
            }
        }

        let descriptor = FittingModelDescriptor {
            model_class: model_class.to_string(),
            kwargs,
        };
        serde_json::to_value(descriptor).map_err(|e| RegistryError::MalformedSymbol {
            symbol: value.to_string(),
            reason: e.to_string(),
        })
    }
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Ordered list of `ValueResolver`s applied recursively over a configuration value tree
/// (§4.D). The first resolver that claims a string value wins.
pub struct ParameterResolverRegistry {
    resolvers: RwLock<Vec<Box<dyn ValueResolver>>>,
}

impl ParameterResolverRegistry {
    pub fn with_builtins() -> Self {
        let registry = Self {
            resolvers: RwLock::new(Vec::new()),
        };
        registry.register(Box::new(ModelResolver));
        registry
    }

    pub fn register(&self, resolver: Box<dyn ValueResolver>) {
        self.resolvers
            .write()
            .expect("parameter resolver registry lock poisoned")
            .push(resolver);
    }

    /// Recursively rewrites every string leaf in `value` that a registered resolver claims.
    pub fn resolve_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(s) => {
                let resolvers = self.resolvers.read().expect("parameter resolver registry lock poisoned");
                for resolver in resolvers.iter() {
                    if resolver.can_resolve(s) {
                        return resolver.resolve(s);
                    }
                }
                Ok(value.clone())
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.resolve_value(item)?);
                }
                Ok(Value::Array(out))
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_value(v)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }
}

impl Default for ParameterResolverRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_resolver_parses_class_and_kwargs() {
        let registry = ParameterResolverRegistry::with_builtins();
        let resolved = registry
            .resolve_value(&json!("model:Gaussian:mu=0,sigma=1.5,label=fit"))
            .unwrap();
        assert_eq!(
            resolved,
            json!({
                "model_class": "Gaussian",
                "kwargs": {"mu": 0, "sigma": 1.5, "label": "fit"}
            })
        );
    }

    #[test]
    fn resolve_value_recurses_into_nested_structures() {
        let registry = ParameterResolverRegistry::with_builtins();
        let resolved = registry
            .resolve_value(&json!({"a": ["model:Gaussian:mu=0", "plain"]}))
            .unwrap();
        assert_eq!(resolved["a"][1], json!("plain"));
        assert_eq!(resolved["a"][0]["model_class"], json!("Gaussian"));
    }

    #[test]
    fn non_model_strings_pass_through_unchanged() {
        let registry = ParameterResolverRegistry::with_builtins();
        let resolved = registry.resolve_value(&json!("plain_value")).unwrap();
        assert_eq!(resolved, json!("plain_value"));
    }
}
