// ============================================================================
// spark-aggregate - Spec Classifier
// Tag a single input node by the capability it exposes
// ============================================================================

use crate::aggregate::input::Input;
use crate::core::value::Value;

/// What a spec node is, as far as the builder is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Opaque constant, never walked
    Scalar,
    /// Exposes the subscribe capability
    ReactiveLeaf,
    /// Keyed container of spec nodes
    MapNode,
    /// Ordered container of spec nodes
    SequenceNode,
}

/// Classify one input node.
///
/// The subscribe capability wins over everything else. Dates and byte
/// buffers are scalars even though they are structured in memory. A shared
/// node classifies as whatever it currently holds.
pub fn classify(input: &Input) -> NodeKind {
    match input {
        Input::Stream(_) | Input::Query(_) => NodeKind::ReactiveLeaf,
        Input::Seq(_) => NodeKind::SequenceNode,
        Input::Map(_) => NodeKind::MapNode,
        Input::Value(value) => classify_value(value),
        Input::Shared(shared) => classify(&shared.borrow()),
    }
}

/// Classify a constant value. Constants never carry the subscribe capability.
pub fn classify_value(value: &Value) -> NodeKind {
    match value {
        Value::Array(_) => NodeKind::SequenceNode,
        Value::Object(_) => NodeKind::MapNode,
        Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::Text(_)
        | Value::Date(_)
        | Value::Bytes(_) => NodeKind::Scalar,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::input::SharedInput;
    use crate::primitives::{Observable, Subject};
    use bytes::Bytes;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn streams_are_reactive_leaves() {
        assert_eq!(classify(&Input::from(Observable::empty())), NodeKind::ReactiveLeaf);
        assert_eq!(classify(&Input::from(Subject::new())), NodeKind::ReactiveLeaf);
    }

    #[test]
    fn containers() {
        assert_eq!(classify(&Input::seq([1, 2])), NodeKind::SequenceNode);
        assert_eq!(classify(&Input::map([("a", 1)])), NodeKind::MapNode);
        assert_eq!(classify(&Input::from(json!([1]))), NodeKind::SequenceNode);
        assert_eq!(classify(&Input::from(json!({}))), NodeKind::MapNode);
    }

    #[test]
    fn atomic_structured_values_are_scalars() {
        assert_eq!(classify(&Input::from(Utc::now())), NodeKind::Scalar);
        assert_eq!(classify(&Input::from(Bytes::from_static(b"abc"))), NodeKind::Scalar);
    }

    #[test]
    fn primitives_are_scalars() {
        for input in [Input::from(1.2), Input::from(true), Input::from("s"), Input::Value(Value::Null)] {
            assert_eq!(classify(&input), NodeKind::Scalar);
        }
    }

    #[test]
    fn shared_classifies_as_contents() {
        let shared = SharedInput::new(Input::seq([1]));
        assert_eq!(classify(&Input::from(&shared)), NodeKind::SequenceNode);

        shared.set(Subject::new());
        assert_eq!(classify(&Input::from(&shared)), NodeKind::ReactiveLeaf);
    }
}
