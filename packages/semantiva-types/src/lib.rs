//! Data/context model for the Semantiva pipeline engine (SPEC_FULL.md §4.A).
//!
//! This crate has no dependency on the engine, registry, or processor crates: it is the
//! shared vocabulary every other crate in the workspace builds on.

pub mod context;
pub mod context_collection;
pub mod data_value;
pub mod error;
pub mod parameter_info;
pub mod payload;
pub mod type_hierarchy;

pub use context::Context;
pub use context_collection::{CollectionValue, ContextCollection};
pub use data_value::{DataCollection, DataValue, ScalarValue};
pub use error::{Result, TypesError};
pub use parameter_info::{ParameterDefault, ParameterInfo};
pub use payload::{ContextCarrier, Payload};
pub use type_hierarchy::TypeHierarchy;
