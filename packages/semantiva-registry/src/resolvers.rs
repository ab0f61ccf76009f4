use regex::Regex;
use serde_json::Value;

use semantiva_processors::{ComponentType, ContextObserver, ContextProcessor, ProcessorMetadata};

use crate::error::{RegistryError, Result};
use crate::name_resolver::NameResolver;

/// `rename:FROM:TO` — reads `FROM`, writes it to `TO`, suppresses `FROM` (§4.D).
pub struct RenameProcessor {
    pub from: String,
    pub to: String,
}

impl ContextProcessor for RenameProcessor {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new(
            format!("rename:{}:{}", self.from, self.to),
            ComponentType::ContextProcessor,
        )
    }

    fn required_keys(&self) -> Vec<String> {
        vec![self.from.clone()]
    }

    fn created_keys(&self) -> Vec<String> {
        vec![self.to.clone()]
    }

    fn suppressed_keys(&self) -> Vec<String> {
        vec![self.from.clone()]
    }

    fn process(
        &self,
        _params: &semantiva_processors::ParamMap,
        observer: &mut dyn ContextObserver,
    ) -> semantiva_processors::Result<()> {
        let value = observer
            .get_context(&self.from)
            .ok_or_else(|| semantiva_processors::ProcessorError::MissingParameter(self.from.clone()))?;
        observer.update_context(&self.to, value)?;
        observer.suppress_context(&self.from)?;
        Ok(())
    }
}

pub struct RenameResolver;

impl NameResolver for RenameResolver {
    fn prefix(&self) -> &'static str {
        "rename"
    }

    fn resolve(
        &self,
        rest: &str,
        _resolve_symbol: &dyn Fn(&str) -> Result<semantiva_processors::ProcessorInstance>,
    ) -> Result<semantiva_processors::ProcessorInstance> {
        let (from, to) = rest.split_once(':').ok_or_else(|| RegistryError::MalformedSymbol {
            symbol: format!("rename:{rest}"),
            reason: "expected rename:FROM:TO".to_string(),
        })?;
        Ok(semantiva_processors::ProcessorInstance::ContextProcessor(Box::new(
            RenameProcessor {
                from: from.to_string(),
                to: to.to_string(),
            },
        )))
    }
}

/// `delete:KEY` — suppresses one key (§4.D).
pub struct DeleteProcessor {
    pub key: String,
}

impl ContextProcessor for DeleteProcessor {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new(format!("delete:{}", self.key), ComponentType::ContextProcessor)
    }

    fn required_keys(&self) -> Vec<String> {
        vec![self.key.clone()]
    }

    fn created_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn suppressed_keys(&self) -> Vec<String> {
        vec![self.key.clone()]
    }

    fn process(
        &self,
        _params: &semantiva_processors::ParamMap,
        observer: &mut dyn ContextObserver,
    ) -> semantiva_processors::Result<()> {
        observer.suppress_context(&self.key)
    }
}

pub struct DeleteResolver;

impl NameResolver for DeleteResolver {
    fn prefix(&self) -> &'static str {
        "delete"
    }

    fn resolve(
        &self,
        rest: &str,
        _resolve_symbol: &dyn Fn(&str) -> Result<semantiva_processors::ProcessorInstance>,
    ) -> Result<semantiva_processors::ProcessorInstance> {
        if rest.is_empty() {
            return Err(RegistryError::MalformedSymbol {
                symbol: "delete:".to_string(),
                reason: "expected delete:KEY".to_string(),
            });
        }
        Ok(semantiva_processors::ProcessorInstance::ContextProcessor(Box::new(
            DeleteProcessor { key: rest.to_string() },
        )))
    }
}

/// `template:"FORMAT":OUT` — formats `FORMAT` using context keys as named placeholders and
/// writes the result to `OUT`. `FORMAT` is restricted to bare `"{name}"` placeholders: no format
/// specifiers, no positional/numeric placeholders, and at least one placeholder (§4.D).
pub struct TemplateProcessor {
    pub format: String,
    pub out: String,
    pub placeholders: Vec<String>,
}

impl ContextProcessor for TemplateProcessor {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new(format!("template:\"{}\":{}", self.format, self.out), ComponentType::ContextProcessor)
    }

    fn required_keys(&self) -> Vec<String> {
        self.placeholders.clone()
    }

    fn created_keys(&self) -> Vec<String> {
        vec![self.out.clone()]
    }

    fn suppressed_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn process(
        &self,
        _params: &semantiva_processors::ParamMap,
        observer: &mut dyn ContextObserver,
    ) -> semantiva_processors::Result<()> {
        let mut rendered = self.format.clone();
        for name in &self.placeholders {
            let value = observer
                .get_context(name)
                .ok_or_else(|| semantiva_processors::ProcessorError::MissingParameter(name.clone()))?;
            let rendered_value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            rendered = rendered.replace(&format!("{{{name}}}"), &rendered_value);
        }
        observer.update_context(&self.out, Value::String(rendered))?;
        Ok(())
    }
}

pub struct TemplateResolver;

impl TemplateResolver {
    fn placeholder_regex() -> Regex {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static placeholder pattern is valid")
    }
}

impl NameResolver for TemplateResolver {
    fn prefix(&self) -> &'static str {
        "template"
    }

    fn resolve(
        &self,
        rest: &str,
        _resolve_symbol: &dyn Fn(&str) -> Result<semantiva_processors::ProcessorInstance>,
    ) -> Result<semantiva_processors::ProcessorInstance> {
        let malformed = |reason: &str| RegistryError::MalformedSymbol {
            symbol: format!("template:{rest}"),
            reason: reason.to_string(),
        };

        if !rest.starts_with('"') {
            return Err(malformed("expected template:\"FORMAT\":OUT"));
        }
        let closing = rest[1..].find('"').ok_or_else(|| malformed("unterminated FORMAT string"))? + 1;
        let format = &rest[1..closing];
        let remainder = rest[closing + 1..].strip_prefix(':').ok_or_else(|| malformed("expected :OUT after FORMAT"))?;
        if remainder.is_empty() {
            return Err(malformed("expected a non-empty OUT key"));
        }

        let placeholder_pattern = Self::placeholder_regex();
        if format.contains('%') {
            return Err(malformed("format specifiers are not allowed, only bare {name} placeholders"));
        }
        let placeholders: Vec<String> = placeholder_pattern
            .captures_iter(format)
            .map(|c| c[1].to_string())
            .collect();
        if placeholders.is_empty() {
            return Err(malformed("at least one {name} placeholder is required"));
        }
        // Reject anything that still looks like a brace after stripping valid placeholders,
        // which catches numeric placeholders like "{0}" and malformed braces.
        let stripped = placeholder_pattern.replace_all(format, "");
        if stripped.contains('{') || stripped.contains('}') {
            return Err(malformed("only bare {name} placeholders are allowed"));
        }

        Ok(semantiva_processors::ProcessorInstance::ContextProcessor(Box::new(
            TemplateProcessor {
                format: format.to_string(),
                out: remainder.to_string(),
                placeholders,
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_processors::ParamMap;
    use semantiva_types::Context;
    use std::collections::HashMap;

    struct RecordingObserver {
        context: Context,
    }

    impl ContextObserver for RecordingObserver {
        fn get_context(&self, key: &str) -> Option<Value> {
            self.context.get(key).cloned()
        }
        fn update_context(&mut self, key: &str, value: Value) -> semantiva_processors::Result<()> {
            self.context.set(key, value);
            Ok(())
        }
        fn suppress_context(&mut self, key: &str) -> semantiva_processors::Result<()> {
            self.context
                .delete(key)
                .map_err(|e| semantiva_processors::ProcessorError::InvalidContextKey(e.to_string()))
        }
    }

    fn resolve_symbol_unused(_: &str) -> Result<semantiva_processors::ProcessorInstance> {
        unreachable!("template: never resolves a nested symbol")
    }

    #[test]
    fn resolves_a_single_placeholder() {
        let instance = TemplateResolver.resolve("\"hello {name}\":greeting", &resolve_symbol_unused).unwrap();
        let semantiva_processors::ProcessorInstance::ContextProcessor(processor) = instance else {
            panic!("expected a ContextProcessor");
        };
        assert_eq!(processor.required_keys(), vec!["name".to_string()]);
        assert_eq!(processor.created_keys(), vec!["greeting".to_string()]);

        let mut context = Context::new();
        context.set("name", Value::String("Ada".to_string()));
        let mut observer = RecordingObserver { context };
        processor.process(&ParamMap::new(), &mut observer).unwrap();
        assert_eq!(observer.context.get("greeting"), Some(&Value::String("hello Ada".to_string())));
    }

    #[test]
    fn resolves_multiple_placeholders_in_order() {
        let instance = TemplateResolver.resolve("\"{a}-{b}\":out", &resolve_symbol_unused).unwrap();
        let semantiva_processors::ProcessorInstance::ContextProcessor(processor) = instance else {
            panic!("expected a ContextProcessor");
        };
        let mut context = Context::new();
        context.set("a", Value::String("x".to_string()));
        context.set("b", Value::String("y".to_string()));
        let mut observer = RecordingObserver { context };
        processor.process(&ParamMap::new(), &mut observer).unwrap();
        assert_eq!(observer.context.get("out"), Some(&Value::String("x-y".to_string())));
    }

    #[test]
    fn rejects_an_unterminated_format_string() {
        let err = TemplateResolver.resolve("\"{name}", &resolve_symbol_unused).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedSymbol { .. }));
    }

    #[test]
    fn rejects_a_missing_opening_quote() {
        let err = TemplateResolver.resolve("{name}\":out", &resolve_symbol_unused).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedSymbol { .. }));
    }

    #[test]
    fn rejects_a_numeric_placeholder() {
        let err = TemplateResolver.resolve("\"{0}\":out", &resolve_symbol_unused).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedSymbol { .. }));
    }

    #[test]
    fn rejects_a_format_with_no_placeholders() {
        let err = TemplateResolver.resolve("\"no placeholders here\":out", &resolve_symbol_unused).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedSymbol { .. }));
    }

    #[test]
    fn rejects_a_format_specifier() {
        let err = TemplateResolver.resolve("\"{name:%d}\":out", &resolve_symbol_unused).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedSymbol { .. }));
    }

    #[test]
    fn missing_placeholder_value_fails_at_process_time() {
        let instance = TemplateResolver.resolve("\"{name}\":out", &resolve_symbol_unused).unwrap();
        let semantiva_processors::ProcessorInstance::ContextProcessor(processor) = instance else {
            panic!("expected a ContextProcessor");
        };
        let mut observer = RecordingObserver { context: Context::new() };
        let err = processor.process(&ParamMap::new(), &mut observer).unwrap_err();
        assert!(matches!(err, semantiva_processors::ProcessorError::MissingParameter(_)));
    }

    #[test]
    fn template_then_delete_restores_the_pre_state_keys() {
        let instance = TemplateResolver.resolve("\"{x}\":y", &resolve_symbol_unused).unwrap();
        let semantiva_processors::ProcessorInstance::ContextProcessor(template) = instance else {
            panic!("expected a ContextProcessor");
        };
        let delete = DeleteProcessor { key: "y".to_string() };

        let mut context = Context::new();
        context.set("x", Value::String("value".to_string()));
        let before: HashMap<String, Value> = context.items().into_iter().collect();

        let mut observer = RecordingObserver { context };
        template.process(&ParamMap::new(), &mut observer).unwrap();
        assert!(observer.context.contains_key("y"));
        delete.process(&ParamMap::new(), &mut observer).unwrap();

        let after: HashMap<String, Value> = observer.context.items().into_iter().collect();
        assert_eq!(before, after);
    }
}
