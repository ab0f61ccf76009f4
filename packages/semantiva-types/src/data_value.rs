use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypesError};
use crate::type_hierarchy::{DATA_COLLECTION, NO_DATA};

/// The built-in scalar payload kinds. Extensions that need a richer value model use
/// `DataValue::Opaque` instead of adding variants here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Boolean(bool),
}

impl ScalarValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Number(_) => "NumberValue",
            ScalarValue::Integer(_) => "IntegerValue",
            ScalarValue::Text(_) => "TextValue",
            ScalarValue::Boolean(_) => "BooleanValue",
        }
    }
}

/// A polymorphic container holding a typed payload value (§3).
///
/// `NoData` signals absence of data (sources take it as input; terminal data-dumps may
/// produce it). `Opaque` is the escape hatch for third-party extension data types: it carries
/// an explicit runtime type name plus a type-erased payload, the Rust-idiomatic replacement for
/// open class-hierarchy extension (see SPEC_FULL.md §2, semantiva-types).
#[derive(Clone)]
pub enum DataValue {
    NoData,
    Scalar(ScalarValue),
    Collection(DataCollection),
    Opaque {
        type_name: String,
        payload: Arc<dyn Any + Send + Sync>,
    },
}

impl fmt::Debug for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::NoData => write!(f, "NoData"),
            DataValue::Scalar(s) => write!(f, "Scalar({:?})", s),
            DataValue::Collection(c) => write!(f, "Collection(len={})", c.len()),
            DataValue::Opaque { type_name, .. } => write!(f, "Opaque({type_name})"),
        }
    }
}

impl DataValue {
    /// The runtime type token used for compatibility checks (§4.A).
    pub fn variant(&self) -> String {
        match self {
            DataValue::NoData => NO_DATA.to_string(),
            DataValue::Scalar(s) => s.type_name().to_string(),
            DataValue::Collection(c) => c.collection_type_name(),
            DataValue::Opaque { type_name, .. } => type_name.clone(),
        }
    }

    pub fn opaque<T: Any + Send + Sync>(type_name: impl Into<String>, payload: T) -> Self {
        DataValue::Opaque {
            type_name: type_name.into(),
            payload: Arc::new(payload),
        }
    }

    pub fn downcast_opaque<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            DataValue::Opaque { payload, .. } => payload.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, DataValue::NoData)
    }
}

/// An ordered, lazily-iterable sequence of `DataValue` elements sharing one element type.
///
/// Invariants (§3): (i) all elements share one element type; (ii) `NoData` never appears
/// inside a collection.
#[derive(Clone)]
pub struct DataCollection {
    element_type: String,
    elements: Vec<DataValue>,
}

impl DataCollection {
    /// Builds a collection from a list, validating the invariants.
    pub fn from_list(elements: Vec<DataValue>) -> Result<Self> {
        let mut element_type: Option<String> = None;
        for el in &elements {
            if el.is_no_data() {
                return Err(TypesError::NoDataInCollection);
            }
            let ty = el.variant();
            match &element_type {
                None => element_type = Some(ty),
                Some(expected) if expected != &ty => {
                    return Err(TypesError::CollectionElementTypeMismatch {
                        expected: expected.clone(),
                        actual: ty,
                    })
                }
                _ => {}
            }
        }
        Ok(Self {
            element_type: element_type.unwrap_or_else(|| "Any".to_string()),
            elements,
        })
    }

    /// An empty collection declared to hold elements of `element_type`.
    pub fn empty(element_type: impl Into<String>) -> Self {
        Self {
            element_type: element_type.into(),
            elements: Vec::new(),
        }
    }

    pub fn append(&mut self, value: DataValue) -> Result<()> {
        if value.is_no_data() {
            return Err(TypesError::NoDataInCollection);
        }
        let ty = value.variant();
        if self.elements.is_empty() && self.element_type == "Any" {
            self.element_type = ty;
        } else if ty != self.element_type {
            return Err(TypesError::CollectionElementTypeMismatch {
                expected: self.element_type.clone(),
                actual: ty,
            });
        }
        self.elements.push(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// The collection's own runtime type token, e.g. `"NumberCollection"`.
    pub fn collection_type_name(&self) -> String {
        if self.element_type.ends_with("Value") {
            format!("{}Collection", &self.element_type[..self.element_type.len() - 5])
        } else {
            format!("{}Collection", self.element_type)
        }
    }

    /// Lazy iteration over the elements, per §3.
    pub fn iter(&self) -> impl Iterator<Item = &DataValue> {
        self.elements.iter()
    }

    pub fn into_vec(self) -> Vec<DataValue> {
        self.elements
    }

    pub fn get(&self, index: usize) -> Option<&DataValue> {
        self.elements.get(index)
    }
}
