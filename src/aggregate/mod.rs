// ============================================================================
// spark-aggregate - Aggregate Module
// Spec trees, leaf adapters, activations, and the public combinator
// ============================================================================

mod activation;
pub mod classify;
pub mod combine;
pub mod input;
pub mod leaf;
pub mod options;
pub mod query;
pub mod tree;

pub use classify::{classify, classify_value, NodeKind};
pub use combine::{all_present, recombine};
pub use input::{Input, Query, SharedInput};
pub use leaf::{LeafAdapter, LeafHandle, LeafSource, LeafState, Mode};
pub use options::AggregateOptions;
pub use query::{aggregate, aggregate_with_options, model, AggregateQuery, Model};
pub use tree::{build, BuiltSpec, SpecTree};
