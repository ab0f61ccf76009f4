use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use semantiva_types::ParameterInfo;

/// The seven processor families a component can register under (§4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    DataSource,
    PayloadSource,
    DataSink,
    PayloadSink,
    DataOperation,
    DataProbe,
    ContextProcessor,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::DataSource => "data_source",
            ComponentType::PayloadSource => "payload_source",
            ComponentType::DataSink => "data_sink",
            ComponentType::PayloadSink => "payload_sink",
            ComponentType::DataOperation => "data_operation",
            ComponentType::DataProbe => "data_probe",
            ComponentType::ContextProcessor => "context_processor",
        }
    }
}

/// Static self-description every processor publishes through `metadata()` (§3).
///
/// Parameter declarations are explicit and hand-authored rather than reflected off a function
/// signature: Rust has no runtime introspection of argument names, so each processor states its
/// own parameter contract rather than having one derived for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorMetadata {
    pub class_name: String,
    pub docstring: String,
    pub component_type: ComponentType,
    pub input_data_type: Option<String>,
    pub output_data_type: Option<String>,
    pub parameters: IndexMap<String, ParameterInfo>,
    pub injected_context_keys: Option<Vec<String>>,
    pub suppressed_context_keys: Option<Vec<String>>,
}

impl ProcessorMetadata {
    pub fn new(class_name: impl Into<String>, component_type: ComponentType) -> Self {
        Self {
            class_name: class_name.into(),
            docstring: String::new(),
            component_type,
            input_data_type: None,
            output_data_type: None,
            parameters: IndexMap::new(),
            injected_context_keys: None,
            suppressed_context_keys: None,
        }
    }

    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = docstring.into();
        self
    }

    pub fn with_input_type(mut self, t: impl Into<String>) -> Self {
        self.input_data_type = Some(t.into());
        self
    }

    pub fn with_output_type(mut self, t: impl Into<String>) -> Self {
        self.output_data_type = Some(t.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, info: ParameterInfo) -> Self {
        self.parameters.insert(name.into(), info);
        self
    }

    pub fn with_injected_context_keys(mut self, keys: Vec<String>) -> Self {
        self.injected_context_keys = Some(keys);
        self
    }

    pub fn with_suppressed_context_keys(mut self, keys: Vec<String>) -> Self {
        self.suppressed_context_keys = Some(keys);
        self
    }
}
