use serde::{Deserialize, Serialize};
use serde_json::Value;

use semantiva_processors::ContextObserver;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Linear,
    Log,
}

/// A numeric range variable (§4.F), generated with the same `linspace`/`logspace` formulas as
/// NumPy's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub lo: f64,
    pub hi: f64,
    pub steps: usize,
    #[serde(default = "default_scale")]
    pub scale: Scale,
    #[serde(default = "default_endpoint")]
    pub endpoint: bool,
}

fn default_scale() -> Scale {
    Scale::Linear
}

fn default_endpoint() -> bool {
    true
}

impl RangeSpec {
    pub fn validate(&self) -> Result<()> {
        if self.steps <= 1 {
            return Err(ConfigError::InvalidSweepDirective(
                "steps must be greater than 1".to_string(),
            ));
        }
        if self.scale == Scale::Log && (self.lo <= 0.0 || self.hi <= 0.0) {
            return Err(ConfigError::InvalidSweepDirective(
                "log scale requires positive bounds".to_string(),
            ));
        }
        Ok(())
    }

    /// Generates the sequence of values this range spans, replicating
    /// `numpy.linspace`/`numpy.logspace` (including the adjusted-stop formula for
    /// `scale: log, endpoint: false`).
    pub fn values(&self) -> Result<Vec<f64>> {
        self.validate()?;
        match self.scale {
            Scale::Linear => Ok(linspace(self.lo, self.hi, self.steps, self.endpoint)),
            Scale::Log => {
                if self.endpoint {
                    Ok(logspace(self.lo.log10(), self.hi.log10(), self.steps))
                } else {
                    let log_range = self.hi.log10() - self.lo.log10();
                    let adjusted_hi = self.lo * 10f64.powf(log_range * (self.steps as f64 - 1.0) / self.steps as f64);
                    Ok(logspace(self.lo.log10(), adjusted_hi.log10(), self.steps))
                }
            }
        }
    }
}

/// `numpy.linspace` semantics: `steps` evenly spaced points, including `hi` iff `endpoint`.
fn linspace(lo: f64, hi: f64, steps: usize, endpoint: bool) -> Vec<f64> {
    if steps == 1 {
        return vec![lo];
    }
    let denom = if endpoint { steps - 1 } else { steps } as f64;
    let step = (hi - lo) / denom;
    (0..steps).map(|i| lo + step * i as f64).collect()
}

/// `numpy.logspace(log10(lo), log10(hi), steps)`: `linspace` in log space, then `10^x`.
fn logspace(log_lo: f64, log_hi: f64, steps: usize) -> Vec<f64> {
    linspace(log_lo, log_hi, steps, true).into_iter().map(|x| 10f64.powf(x)).collect()
}

/// An explicit sequence of values (§4.F). Mirrors `SequenceSpec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSpec {
    pub values: Vec<Value>,
}

impl SequenceSpec {
    pub fn validate(&self) -> Result<()> {
        if self.values.is_empty() {
            return Err(ConfigError::InvalidSweepDirective("values must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// A sequence read from the pipeline context at sweep-execution time (§4.F). Mirrors
/// `FromContext`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromContextSpec {
    pub from_context: String,
}

/// One independent variable's value specification (§4.F).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarSpec {
    Range(RangeSpec),
    Sequence(SequenceSpec),
    FromContext(FromContextSpec),
}

impl VarSpec {
    /// Resolves this variable to its sequence of values, reading the bound context through
    /// `observer` for `FromContext` variables.
    pub fn resolve(&self, observer: &dyn ContextObserver) -> Result<Vec<Value>> {
        match self {
            VarSpec::Range(r) => Ok(r.values()?.into_iter().map(Value::from).collect()),
            VarSpec::Sequence(s) => {
                s.validate()?;
                Ok(s.values.clone())
            }
            VarSpec::FromContext(f) => {
                let value = observer
                    .get_context(&f.from_context)
                    .ok_or_else(|| ConfigError::InvalidSweepContextValue(f.from_context.clone()))?;
                match value {
                    Value::Array(items) if !items.is_empty() => Ok(items),
                    _ => Err(ConfigError::InvalidSweepContextValue(f.from_context.clone())),
                }
            }
        }
    }
}
