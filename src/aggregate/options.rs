// ============================================================================
// spark-aggregate - Aggregate Options
// ============================================================================

use crate::core::constants::DEFAULT_MAX_DEPTH;
use crate::core::types::{default_equals, EqualsFn};
use crate::core::value::Value;

/// Options for building an aggregate.
///
/// # Example
///
/// ```
/// use spark_aggregate::AggregateOptions;
///
/// let options = AggregateOptions::default().with_max_depth(8).distinct();
/// assert_eq!(options.max_depth, 8);
/// assert!(options.equals.is_some());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// Deepest container nesting the builder accepts
    pub max_depth: usize,

    /// When set, a composite equal to the previous one is not emitted.
    /// By default every leaf emission yields a fresh composite.
    pub equals: Option<EqualsFn<Value>>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            equals: None,
        }
    }
}

impl AggregateOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_equals(mut self, equals: EqualsFn<Value>) -> Self {
        self.equals = Some(equals);
        self
    }

    /// Suppress composites structurally equal to the previous one.
    pub fn distinct(self) -> Self {
        self.with_equals(default_equals::<Value>)
    }
}
