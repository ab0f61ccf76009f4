use serde_json::Value;

use crate::context::Context;
use crate::error::{Result, TypesError};

/// Accessed value for a key in a `ContextCollection`: either the single global scalar, or the
/// ordered per-item list (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionValue {
    Global(Value),
    PerItem(Vec<Option<Value>>),
}

/// A `Context` specialisation carrying one global `Context` plus an ordered list of per-item
/// `Context`s (§3, §4.A).
#[derive(Debug, Clone, Default)]
pub struct ContextCollection {
    global: Context,
    items: Vec<Context>,
}

impl ContextCollection {
    pub fn new(global: Context, items: Vec<Context>) -> Self {
        Self { global, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn global(&self) -> &Context {
        &self.global
    }

    /// Mutable access to the global context, for callers (the step executor) that bind a
    /// `ContextObserver` against the collection's shared state rather than against one item.
    pub fn global_mut(&mut self) -> &mut Context {
        &mut self.global
    }

    pub fn items(&self) -> &[Context] {
        &self.items
    }

    pub fn append(&mut self, item: Context) {
        self.items.push(item);
    }

    fn item_has_key(&self, key: &str) -> bool {
        self.items.iter().any(|c| c.contains_key(key))
    }

    /// Merges the global context with item `index`. A key present in both is a
    /// `FragileOverlap`, never silently resolved.
    pub fn get_item(&self, index: usize) -> Result<Context> {
        let item = self
            .items
            .get(index)
            .ok_or(TypesError::ItemIndexOutOfRange(index))?;

        for key in item.keys() {
            if self.global.contains_key(&key) {
                return Err(TypesError::FragileOverlap {
                    key,
                    item_index: index,
                });
            }
        }

        let mut merged = self.global.clone();
        for (k, v) in item.items() {
            merged.set(k, v);
        }
        Ok(merged)
    }

    /// §3 access rule: global-only → single value; items-only → ordered list (`null` for
    /// missing items); present in both → `FragileOverlap`.
    pub fn get(&self, key: &str) -> Result<Option<CollectionValue>> {
        let in_global = self.global.contains_key(key);
        let in_any_item = self.item_has_key(key);

        if in_global && in_any_item {
            // Find the first offending item index for a useful error.
            let item_index = self
                .items
                .iter()
                .position(|c| c.contains_key(key))
                .unwrap_or(0);
            return Err(TypesError::FragileOverlap {
                key: key.to_string(),
                item_index,
            });
        }

        if in_global {
            return Ok(self.global.get(key).cloned().map(CollectionValue::Global));
        }

        if in_any_item {
            let values = self
                .items
                .iter()
                .map(|c| c.get(key).cloned())
                .collect::<Vec<_>>();
            return Ok(Some(CollectionValue::PerItem(values)));
        }

        Ok(None)
    }

    /// §3 `setValue`: updates global if the key is there; else broadcasts to every item that
    /// already has it; else creates it in global.
    pub fn set_value(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.global.contains_key(&key) {
            self.global.set(key, value);
        } else if self.item_has_key(&key) {
            for item in &mut self.items {
                item.set(key.clone(), value.clone());
            }
        } else {
            self.global.set(key, value);
        }
    }

    /// §3 `setItemValue`: forbidden if the key is global; else writes into item `i`.
    pub fn set_item_value(&mut self, index: usize, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        if self.global.contains_key(&key) {
            return Err(TypesError::GlobalKeyOnItem(key));
        }
        let item = self
            .items
            .get_mut(index)
            .ok_or(TypesError::ItemIndexOutOfRange(index))?;
        item.set(key, value);
        Ok(())
    }

    /// Union of keys from global and all items. Raises `FragileOverlap` on conflict.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut seen = std::collections::BTreeSet::new();
        let global_keys: std::collections::HashSet<_> = self.global.keys().into_iter().collect();
        let mut item_keys = std::collections::HashSet::new();
        for item in &self.items {
            for k in item.keys() {
                item_keys.insert(k);
            }
        }
        if let Some(conflict) = global_keys.intersection(&item_keys).next() {
            return Err(TypesError::FragileOverlap {
                key: conflict.clone(),
                item_index: self
                    .items
                    .iter()
                    .position(|c| c.contains_key(conflict))
                    .unwrap_or(0),
            });
        }
        for k in global_keys.into_iter().chain(item_keys) {
            seen.insert(k);
        }
        Ok(seen.into_iter().collect())
    }

    pub fn delete(&mut self, key: &str) -> Result<()> {
        let mut found = false;
        if self.global.contains_key(key) {
            self.global.delete(key)?;
            found = true;
        }
        for item in &mut self.items {
            if item.contains_key(key) {
                item.delete(key)?;
                found = true;
            }
        }
        if !found {
            return Err(TypesError::KeyNotFound(key.to_string()));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.global.clear();
        for item in &mut self.items {
            item.clear();
        }
    }
}
