// ============================================================================
// spark-aggregate - Snapshot Combiner
// Rebuild the composite value from the tree shape and current leaf values
// ============================================================================

use crate::aggregate::leaf::LeafState;
use crate::aggregate::tree::SpecTree;
use crate::core::value::Value;

/// Substitute every leaf's latest value into the tree shape.
///
/// Pure and deterministic. Callers only invoke it once every leaf has a
/// value; a missing one shows up as `Null`.
pub fn recombine(tree: &SpecTree, leaves: &[LeafState]) -> Value {
    match tree {
        SpecTree::Scalar(value) => value.clone(),
        SpecTree::Leaf(index) => {
            let value = leaves.get(*index).and_then(LeafState::last_value);
            debug_assert!(value.is_some(), "leaf {index} recombined before its first value");
            value.cloned().unwrap_or_default()
        }
        SpecTree::Map(map) => Value::Object(
            map.iter()
                .map(|(key, child)| (key.clone(), recombine(child, leaves)))
                .collect(),
        ),
        SpecTree::Seq(items) => {
            Value::Array(items.iter().map(|child| recombine(child, leaves)).collect())
        }
    }
}

/// True when every leaf has produced at least one value.
pub fn all_present(leaves: &[LeafState]) -> bool {
    leaves.iter().all(LeafState::has_value)
}

// =============================================================================
// TESTS
// =============================================================================
