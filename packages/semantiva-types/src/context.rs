use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Result, TypesError};

/// A keyed map from string keys to arbitrary values, threaded through a pipeline run (§3, §4.A).
///
/// Keys preserve insertion order (reproducibility of iteration-derived fingerprints); each key
/// appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    container: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(container: IndexMap<String, Value>) -> Self {
        Self { container }
    }

    /// Returns the stored value, or `None` if the key is absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.container.get(key)
    }

    /// Overwrites (or inserts) the value for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.container.insert(key.into(), value);
    }

    /// Removes `key`. Fails with `KeyNotFound` if absent.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.container
            .shift_remove(key)
            .map(|_| ())
            .ok_or_else(|| TypesError::KeyNotFound(key.to_string()))
    }

    pub fn clear(&mut self) {
        self.container.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.container.keys().cloned().collect()
    }

    pub fn items(&self) -> Vec<(String, Value)> {
        self.container
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.container.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_roundtrips() {
        let mut ctx = Context::new();
        ctx.set("a", json!(1));
        assert_eq!(ctx.get("a"), Some(&json!(1)));
    }

    #[test]
    fn delete_missing_key_fails() {
        let mut ctx = Context::new();
        let err = ctx.delete("missing").unwrap_err();
        assert_eq!(err, TypesError::KeyNotFound("missing".to_string()));
    }

    #[test]
    fn keys_preserve_insertion_order() {
        let mut ctx = Context::new();
        ctx.set("z", json!(1));
        ctx.set("a", json!(2));
        ctx.set("m", json!(3));
        assert_eq!(ctx.keys(), vec!["z", "a", "m"]);
    }

    #[test]
    fn rename_then_delete_restores_empty_context() {
        // Scenario 3 / round-trip law: rename:src:dst then delete:dst.
        let mut ctx = Context::new();
        ctx.set("src", json!(7));

        let v = ctx.get("src").cloned().unwrap();
        ctx.delete("src").unwrap();
        ctx.set("dst", v);
        ctx.delete("dst").unwrap();

        assert!(ctx.is_empty());
    }
}
