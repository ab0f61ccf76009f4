pub mod examples;

pub use examples::SemantivaExamplesExtension;
