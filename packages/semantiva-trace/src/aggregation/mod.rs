pub mod aggregator;
pub mod models;

pub use aggregator::TraceAggregator;
pub use models::{
    CompletenessStatus, LaunchAggregate, LaunchCompleteness, NodeAggregate, RunAggregate, RunCompleteness,
};
