use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use semantiva_processors::{
    ComponentType, ContextObserver, DataOperation, DataProbe, DataValue, ParamMap, ProcessorError, ProcessorInstance,
    ProcessorMetadata,
};
use semantiva_types::DataCollection;

use crate::error::{ConfigError, Result};
use crate::var_spec::VarSpec;

/// How independent variable sequences combine into parameter combinations (§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    Combinatorial,
    ByPosition,
}

impl Default for SweepMode {
    fn default() -> Self {
        SweepMode::Combinatorial
    }
}

/// The `derive.parameter_sweep` directive (§4.F).
///
/// `parameters` maps the swept-over processor's own parameter names to the variable name
/// supplying their value at each step: each parameter is bound directly to one variable's
/// current value rather than to an evaluated expression over several variables, since arbitrary
/// expression evaluation has no idiomatic Rust equivalent (documented as an Open Question
/// decision in DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSweepDirective {
    pub parameters: IndexMap<String, String>,
    pub variables: IndexMap<String, VarSpec>,
    #[serde(default)]
    pub mode: SweepMode,
    #[serde(default)]
    pub broadcast: bool,
    pub collection: Option<String>,
}

impl ParameterSweepDirective {
    fn validate(&self) -> Result<()> {
        if self.variables.is_empty() {
            return Err(ConfigError::InvalidSweepDirective("variables must be non-empty".to_string()));
        }
        for var_name in self.parameters.values() {
            if !self.variables.contains_key(var_name) {
                return Err(ConfigError::InvalidSweepDirective(format!(
                    "parameters references unknown variable '{var_name}'"
                )));
            }
        }
        Ok(())
    }

    /// Resolves every variable to its sequence of values, then combines them into the ordered
    /// list of per-step parameter maps this sweep will call its inner processor with.
    fn resolve_combinations(&self, observer: &dyn ContextObserver) -> Result<(IndexMap<String, Vec<Value>>, Vec<IndexMap<String, Value>>)> {
        self.validate()?;
        let mut sequences: IndexMap<String, Vec<Value>> = IndexMap::new();
        for (name, spec) in &self.variables {
            sequences.insert(name.clone(), spec.resolve(observer)?);
        }

        let combinations = match self.mode {
            SweepMode::Combinatorial => combinatorial_product(&sequences),
            SweepMode::ByPosition => by_position(&sequences, self.broadcast)?,
        };

        let steps = combinations
            .into_iter()
            .map(|combo| {
                let mut params = IndexMap::new();
                for (param_name, var_name) in &self.parameters {
                    if let Some(value) = combo.get(var_name) {
                        params.insert(param_name.clone(), value.clone());
                    }
                }
                params
            })
            .collect();
        Ok((sequences, steps))
    }
}

fn combinatorial_product(sequences: &IndexMap<String, Vec<Value>>) -> Vec<IndexMap<String, Value>> {
    let mut combos: Vec<IndexMap<String, Value>> = vec![IndexMap::new()];
    for (name, values) in sequences {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in values {
                let mut extended = combo.clone();
                extended.insert(name.clone(), value.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

fn by_position(sequences: &IndexMap<String, Vec<Value>>, broadcast: bool) -> Result<Vec<IndexMap<String, Value>>> {
    let lengths: Vec<usize> = sequences.values().map(|v| v.len()).collect();
    let step_count = if broadcast {
        *lengths.iter().max().unwrap_or(&0)
    } else {
        let first = lengths[0];
        if lengths.iter().any(|&l| l != first) {
            return Err(ConfigError::InvalidSweepDirective(format!(
                "all variable sequences must have identical lengths in by_position mode without broadcast (found {lengths:?})"
            )));
        }
        first
    };

    let mut combos = Vec::with_capacity(step_count);
    for i in 0..step_count {
        let mut combo = IndexMap::new();
        for (name, values) in sequences {
            let value = if broadcast {
                values[i % values.len()].clone()
            } else {
                values[i].clone()
            };
            combo.insert(name.clone(), value);
        }
        combos.push(combo);
    }
    Ok(combos)
}

fn to_param_map(step: &IndexMap<String, Value>) -> ParamMap {
    step.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Generates a `DataOperation` that runs an inner `DataSource` once per sweep step and collects
/// the outputs into a `DataCollection` (§4.F): a constructor function producing a value that
/// carries its own resolved variable table, rather than a type generated at runtime.
struct SweepGeneratedOperation {
    element_source: Box<dyn semantiva_processors::DataSource>,
    directive: ParameterSweepDirective,
    collection_type: String,
}

impl DataOperation for SweepGeneratedOperation {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new(
            format!("{}ParametricSweep", self.element_source.metadata().class_name),
            ComponentType::DataOperation,
        )
        .with_input_type("NoData")
        .with_output_type(self.collection_type.clone())
        .with_injected_context_keys(self.directive.variables.keys().map(|v| format!("{v}_values")).collect())
    }

    fn process(
        &self,
        _input: DataValue,
        params: &ParamMap,
        observer: &mut dyn ContextObserver,
    ) -> semantiva_processors::Result<DataValue> {
        let (sequences, steps) = self
            .directive
            .resolve_combinations(observer)
            .map_err(|e| ProcessorError::Other(e.to_string()))?;

        for (var, values) in &sequences {
            observer.update_context(&format!("{var}_values"), Value::Array(values.clone()))?;
        }

        let mut elements = Vec::with_capacity(steps.len());
        for step in &steps {
            let mut step_params = params.clone();
            step_params.extend(to_param_map(step));
            elements.push(self.element_source.produce(&step_params)?);
        }
        let collection = DataCollection::from_list(elements).map_err(|e| ProcessorError::Other(e.to_string()))?;
        Ok(DataValue::Collection(collection))
    }
}

/// Generates a `DataProbe` that runs an inner probe once per sweep step and returns the ordered
/// list of observations directly (§4.F: "DataProbe sweeps must not declare `collection` and
/// produce a list").
struct SweepGeneratedProbe {
    inner: Box<dyn DataProbe>,
    directive: ParameterSweepDirective,
}

impl DataProbe for SweepGeneratedProbe {
    fn metadata(&self) -> ProcessorMetadata {
        ProcessorMetadata::new(
            format!("{}ParametricSweep", self.inner.metadata().class_name),
            ComponentType::DataProbe,
        )
        .with_input_type("NoData")
        .with_injected_context_keys(self.directive.variables.keys().map(|v| format!("{v}_values")).collect())
    }

    fn observe(&self, input: &DataValue, params: &ParamMap) -> semantiva_processors::Result<Value> {
        struct NullObserver;
        impl ContextObserver for NullObserver {
            fn get_context(&self, _key: &str) -> Option<Value> {
                None
            }
            fn update_context(&mut self, _key: &str, _value: Value) -> semantiva_processors::Result<()> {
                Ok(())
            }
            fn suppress_context(&mut self, _key: &str) -> semantiva_processors::Result<()> {
                Ok(())
            }
        }
        let mut observer = NullObserver;
        let (_, steps) = self
            .directive
            .resolve_combinations(&observer)
            .map_err(|e| ProcessorError::Other(e.to_string()))?;

        let mut observed = Vec::with_capacity(steps.len());
        for step in &steps {
            let mut step_params = params.clone();
            step_params.extend(to_param_map(step));
            observed.push(self.inner.observe(input, &step_params)?);
        }
        let _ = &mut observer;
        Ok(Value::Array(observed))
    }
}

/// Builds the generated sweep processor that `preprocess_node_config` substitutes for a node
/// declaring `derive.parameter_sweep` (§4.F).
pub struct ParametricSweepFactory;

impl ParametricSweepFactory {
    pub fn build(directive: ParameterSweepDirective, inner: ProcessorInstance) -> Result<ProcessorInstance> {
        directive.validate()?;
        match inner {
            ProcessorInstance::DataSource(source) => {
                let collection_type = directive.collection.clone().ok_or_else(|| {
                    ConfigError::InvalidSweepDirective(
                        "DataSource sweeps must declare 'collection'".to_string(),
                    )
                })?;
                Ok(ProcessorInstance::DataOperation(Box::new(SweepGeneratedOperation {
                    element_source: source,
                    directive,
                    collection_type,
                })))
            }
            ProcessorInstance::DataProbe(probe) => {
                if directive.collection.is_some() {
                    return Err(ConfigError::InvalidSweepDirective(
                        "DataProbe sweeps must not declare 'collection'".to_string(),
                    ));
                }
                Ok(ProcessorInstance::DataProbe(Box::new(SweepGeneratedProbe { inner: probe, directive })))
            }
            other => Err(ConfigError::InvalidSweepDirective(format!(
                "parameter sweeps are only supported over DataSource and DataProbe processors, got {:?}",
                other.metadata().component_type
            ))),
        }
    }
}
