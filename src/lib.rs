// ============================================================================
// spark-aggregate - Reactive Aggregate Queries for Rust
// ============================================================================
//
// Combine constants, streams, and queries arranged in nested maps and
// sequences into one stream of composite values with the same shape.
// ============================================================================

//! Reactive aggregate queries.
//!
//! An aggregate spec is a tree of maps, sequences, constants, and reactive
//! leaves (streams or queries). [`aggregate`] validates the spec once;
//! each subscription to [`AggregateQuery::fetch`] or [`AggregateQuery::watch`]
//! subscribes every leaf, waits until all have produced a value, and then
//! emits a freshly assembled composite on every further leaf emission.
//!
//! ```
//! use spark_aggregate::{aggregate, spec, Observable, Value};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let query = aggregate(spec!({
//!     "user" => (Observable::just(Value::from("ada"))),
//!     "tags" => ["admin", "ops"],
//! }))
//! .unwrap();
//!
//! let out = Rc::new(RefCell::new(Vec::new()));
//! let sink = out.clone();
//! let _sub = query.fetch().subscribe_fn(move |v| sink.borrow_mut().push(v.to_json()));
//!
//! assert_eq!(
//!     *out.borrow(),
//!     vec![serde_json::json!({ "user": "ada", "tags": ["admin", "ops"] })]
//! );
//! ```

#[macro_use]
mod macros;

pub mod aggregate;
pub mod core;
pub mod primitives;

// Re-export core items at crate root for ergonomic access
pub use core::constants;
pub use core::error::{LeafError, MalformedSpecError};
pub use core::types::{default_equals, EqualsFn, FnObserver, Observer, TeardownFn};
pub use core::value::Value;

// Re-export stream primitives
pub use primitives::{Observable, Subject, Subscriber, Subscription};

// Re-export the aggregate API
pub use aggregate::{
    aggregate, aggregate_with_options, all_present, build, classify, classify_value, model,
    recombine, AggregateOptions, AggregateQuery, BuiltSpec, Input, LeafAdapter, LeafHandle,
    LeafSource, LeafState, Mode, Model, NodeKind, Query, SharedInput, SpecTree,
};

// =============================================================================
// TESTS
// =============================================================================
