//! Static contract validation for Semantiva processors and nodes (SPEC_FULL.md §4.H).
//!
//! A flat, table-driven catalog of SVA-coded rules (`messages.rs`), each with a severity and a
//! `check` function run against either a processor's [`ProcessorMetadata`] (`rules.rs`, SVA100-250)
//! or a graph [`Node`] (`node_rules.rs`, SVA300-321). `validate_component`/`validate_components`
//! are the entry points a CLI `dev lint` command or the inspection builder calls before a
//! pipeline is executed.

pub mod catalog;
pub mod diagnostic;
pub mod error;
pub mod messages;
pub mod node_rules;
pub mod rules;

pub use catalog::Catalog;
pub use diagnostic::{Diagnostic, Severity};
pub use error::{ContractError, Result};

use semantiva_processors::{Node, ProcessorMetadata};

/// Runs every applicable metadata rule against one processor (§4.H `validateComponent`).
pub fn validate_component(component: &str, metadata: &ProcessorMetadata) -> Vec<Diagnostic> {
    rules::validate_metadata(component, metadata)
}

/// Batch form of [`validate_component`] (§4.H `validateComponents`).
pub fn validate_components<'a>(
    components: impl IntoIterator<Item = (&'a str, &'a ProcessorMetadata)>,
) -> Vec<Diagnostic> {
    components
        .into_iter()
        .flat_map(|(name, md)| validate_component(name, md))
        .collect()
}

/// Runs every applicable node-wrapper rule against one graph node (§4.H SVA300-321).
pub fn validate_node(component: &str, node: &Node) -> Vec<Diagnostic> {
    node_rules::validate_node(component, node)
}

/// Batch form of [`validate_node`].
pub fn validate_nodes<'a>(nodes: impl IntoIterator<Item = (&'a str, &'a Node)>) -> Vec<Diagnostic> {
    nodes.into_iter().flat_map(|(name, n)| validate_node(name, n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantiva_processors::ComponentType;

    #[test]
    fn validate_components_aggregates_across_many_processors() {
        let a = ProcessorMetadata::new("A", ComponentType::DataSource);
        let b = ProcessorMetadata::new("B", ComponentType::DataSink);
        let diags = validate_components([("A", &a), ("B", &b)]);
        assert!(diags.iter().any(|d| d.component == "A" && d.code == "SVA200"));
        assert!(diags.iter().any(|d| d.component == "B" && d.code == "SVA210"));
    }
}
