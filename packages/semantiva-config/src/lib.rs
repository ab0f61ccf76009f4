//! Node configuration preprocessing, parametric sweeps, and runtime parameter resolution
//! (SPEC_FULL.md §4.F, §4.G).

pub mod error;
pub mod preprocess;
pub mod resolve;
pub mod sweep;
pub mod var_spec;

pub use error::{ConfigError, Result};
pub use preprocess::{preprocess_node_config, DeriveDirective, NodeConfig, PreprocessedNode, ProcessorSource};
pub use resolve::{classify_unknown_config_params, resolve_runtime_value, UnknownParameter};
pub use sweep::{ParameterSweepDirective, ParametricSweepFactory, SweepMode};
pub use var_spec::{FromContextSpec, RangeSpec, Scale, SequenceSpec, VarSpec};
