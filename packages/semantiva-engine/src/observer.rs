use std::cell::RefCell;
use std::collections::HashSet;

use serde_json::Value;

use semantiva_processors::{ContextObserver, ProcessorError, Result as ProcResult};
use semantiva_types::Context;

/// The mutation surface bound to a processor for the duration of one node's execution (§4.J
/// step 3, §5 "context ownership"). Accepts only writes to keys the node declared it may create
/// or delete; anything else is `InvalidContextKey`. Tracks every read/created/updated/suppressed
/// key so the step executor can assemble the SER's `context_delta` (§4.L) without re-deriving it.
///
/// `read_keys` is behind a `RefCell`: `ContextObserver::get_context` takes `&self` (a processor
/// only ever borrows the observer immutably to read), so tracking reads needs interior
/// mutability rather than a `&mut self` receiver.
pub struct ValidatingContextObserver<'a> {
    context: &'a mut Context,
    allowed_writes: HashSet<String>,
    allowed_suppressions: HashSet<String>,
    read_keys: RefCell<Vec<String>>,
    created_keys: Vec<String>,
    updated_keys: Vec<String>,
}

impl<'a> ValidatingContextObserver<'a> {
    pub fn new(
        context: &'a mut Context,
        allowed_writes: impl IntoIterator<Item = String>,
        allowed_suppressions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            context,
            allowed_writes: allowed_writes.into_iter().collect(),
            allowed_suppressions: allowed_suppressions.into_iter().collect(),
            read_keys: RefCell::new(Vec::new()),
            created_keys: Vec::new(),
            updated_keys: Vec::new(),
        }
    }

    pub fn read_keys(&self) -> Vec<String> {
        self.read_keys.borrow().clone()
    }

    pub fn created_keys(&self) -> &[String] {
        &self.created_keys
    }

    pub fn updated_keys(&self) -> &[String] {
        &self.updated_keys
    }
}

impl<'a> ContextObserver for ValidatingContextObserver<'a> {
    fn get_context(&self, key: &str) -> Option<Value> {
        let mut read_keys = self.read_keys.borrow_mut();
        if !read_keys.iter().any(|k| k == key) {
            read_keys.push(key.to_string());
        }
        self.context.get(key).cloned()
    }

    fn update_context(&mut self, key: &str, value: Value) -> ProcResult<()> {
        if !self.allowed_writes.contains(key) {
            return Err(ProcessorError::InvalidContextKey(key.to_string()));
        }
        let existed = self.context.contains_key(key);
        self.context.set(key, value);
        if existed {
            if !self.updated_keys.contains(&key.to_string()) {
                self.updated_keys.push(key.to_string());
            }
        } else if !self.created_keys.contains(&key.to_string()) {
            self.created_keys.push(key.to_string());
        }
        Ok(())
    }

    fn suppress_context(&mut self, key: &str) -> ProcResult<()> {
        if !self.allowed_suppressions.contains(key) {
            return Err(ProcessorError::InvalidContextKey(key.to_string()));
        }
        self.context.delete(key).map_err(|e| ProcessorError::InvalidContextKey(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_to_an_undeclared_key_is_rejected() {
        let mut ctx = Context::new();
        let mut observer = ValidatingContextObserver::new(&mut ctx, vec!["allowed".to_string()], vec![]);
        let err = observer.update_context("not_allowed", json!(1)).unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidContextKey(_)));
    }

    #[test]
    fn write_to_a_declared_key_succeeds_and_is_tracked_as_created() {
        let mut ctx = Context::new();
        let mut observer = ValidatingContextObserver::new(&mut ctx, vec!["k".to_string()], vec![]);
        observer.update_context("k", json!(42)).unwrap();
        assert_eq!(observer.created_keys(), &["k".to_string()]);
        assert_eq!(observer.get_context("k"), Some(json!(42)));
    }

    #[test]
    fn rewriting_an_existing_key_is_tracked_as_updated_not_created() {
        let mut ctx = Context::new();
        ctx.set("k", json!(1));
        let mut observer = ValidatingContextObserver::new(&mut ctx, vec!["k".to_string()], vec![]);
        observer.update_context("k", json!(2)).unwrap();
        assert!(observer.created_keys().is_empty());
        assert_eq!(observer.updated_keys(), &["k".to_string()]);
    }

    #[test]
    fn suppressing_an_undeclared_key_is_rejected() {
        let mut ctx = Context::new();
        ctx.set("k", json!(1));
        let mut observer = ValidatingContextObserver::new(&mut ctx, vec![], vec![]);
        let err = observer.suppress_context("k").unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidContextKey(_)));
    }

    #[test]
    fn suppressing_a_declared_key_removes_it() {
        let mut ctx = Context::new();
        ctx.set("k", json!(1));
        let mut observer = ValidatingContextObserver::new(&mut ctx, vec![], vec!["k".to_string()]);
        observer.suppress_context("k").unwrap();
        assert!(!ctx.contains_key("k"));
    }
}
