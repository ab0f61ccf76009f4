use std::collections::{HashMap, HashSet};

/// The ambient type hierarchy consulted by `DataValue::is_compatible` (§4.A).
///
/// Edges point from a subtype name to its declared supertype name(s). Compatibility is
/// `actual == expected || actual <: expected`, where `<:` is the transitive closure of
/// registered edges. Registration happens once at bootstrap (builtins) plus whenever an
/// extension registers a new concrete data type; reads afterward need no locking from the
/// caller's perspective because the registry that owns a `TypeHierarchy` wraps it itself.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    supertypes: HashMap<String, Vec<String>>,
}

pub const ANY: &str = "Any";
pub const NO_DATA: &str = "NoData";
pub const DATA_COLLECTION: &str = "DataCollection";

impl TypeHierarchy {
    /// Builds a hierarchy seeded with the built-in scalar/collection types.
    pub fn with_builtins() -> Self {
        let mut h = Self::default();
        h.register_supertype(NO_DATA, ANY);
        h.register_supertype("NumberValue", ANY);
        h.register_supertype("IntegerValue", ANY);
        h.register_supertype("TextValue", ANY);
        h.register_supertype("BooleanValue", ANY);
        h.register_supertype(DATA_COLLECTION, ANY);
        h.register_supertype("NumberCollection", DATA_COLLECTION);
        h.register_supertype("IntegerCollection", DATA_COLLECTION);
        h.register_supertype("TextCollection", DATA_COLLECTION);
        h
    }

    /// Registers `sub <: sup`. Idempotent: registering the same edge twice is a no-op.
    pub fn register_supertype(&mut self, sub: impl Into<String>, sup: impl Into<String>) {
        let sub = sub.into();
        let sup = sup.into();
        let entry = self.supertypes.entry(sub).or_default();
        if !entry.contains(&sup) {
            entry.push(sup);
        }
    }

    /// `actual == expected OR actual <: expected` via transitive closure of registered edges.
    pub fn is_compatible(&self, actual: &str, expected: &str) -> bool {
        if actual == expected || expected == ANY {
            return true;
        }
        let mut seen = HashSet::new();
        let mut frontier = vec![actual.to_string()];
        while let Some(ty) = frontier.pop() {
            if !seen.insert(ty.clone()) {
                continue;
            }
            if let Some(supers) = self.supertypes.get(&ty) {
                for s in supers {
                    if s == expected {
                        return true;
                    }
                    frontier.push(s.clone());
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_number_collection_is_compatible_with_data_collection() {
        let h = TypeHierarchy::with_builtins();
        assert!(h.is_compatible("NumberCollection", DATA_COLLECTION));
        assert!(h.is_compatible("NumberCollection", ANY));
        assert!(!h.is_compatible("NumberCollection", "TextCollection"));
    }

    #[test]
    fn exact_match_is_always_compatible() {
        let h = TypeHierarchy::with_builtins();
        assert!(h.is_compatible("NumberValue", "NumberValue"));
    }

    #[test]
    fn custom_extension_edge_is_honored() {
        let mut h = TypeHierarchy::with_builtins();
        h.register_supertype("ImageValue", ANY);
        h.register_supertype("GrayscaleImageValue", "ImageValue");
        assert!(h.is_compatible("GrayscaleImageValue", "ImageValue"));
        assert!(h.is_compatible("GrayscaleImageValue", ANY));
    }
}
