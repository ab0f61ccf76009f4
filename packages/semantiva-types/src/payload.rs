use crate::context::Context;
use crate::context_collection::ContextCollection;
use crate::data_value::DataValue;

/// Either kind of context a `Payload` may carry through a run.
#[derive(Debug, Clone)]
pub enum ContextCarrier {
    Single(Context),
    Collection(ContextCollection),
}

impl ContextCarrier {
    pub fn as_single(&self) -> Option<&Context> {
        match self {
            ContextCarrier::Single(c) => Some(c),
            ContextCarrier::Collection(_) => None,
        }
    }

    pub fn as_single_mut(&mut self) -> Option<&mut Context> {
        match self {
            ContextCarrier::Single(c) => Some(c),
            ContextCarrier::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&ContextCollection> {
        match self {
            ContextCarrier::Collection(c) => Some(c),
            ContextCarrier::Single(_) => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut ContextCollection> {
        match self {
            ContextCarrier::Collection(c) => Some(c),
            ContextCarrier::Single(_) => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, ContextCarrier::Collection(_))
    }
}

/// `Payload` = (data, context) (§3). Owned by the executor for the duration of a run and
/// mutated only through the `ValidatingContextObserver` in `semantiva-engine`.
#[derive(Debug, Clone)]
pub struct Payload {
    pub data: DataValue,
    pub context: ContextCarrier,
}

impl Payload {
    pub fn new(data: DataValue, context: ContextCarrier) -> Self {
        Self { data, context }
    }

    pub fn with_single_context(data: DataValue, context: Context) -> Self {
        Self {
            data,
            context: ContextCarrier::Single(context),
        }
    }
}
