// ============================================================================
// spark-aggregate - Errors
// Build-time spec errors and runtime leaf errors
// ============================================================================

use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// MALFORMED SPEC
// =============================================================================

/// An input that cannot be turned into a spec tree.
///
/// Always returned synchronously by `aggregate()`, before anything is
/// subscribed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedSpecError {
    /// A shared node contains itself, directly or transitively
    #[error("spec node at {path} contains itself")]
    Cycle {
        /// Location of the repeated node, e.g. `$.b.e[0]`
        path: String,
    },

    /// Nesting exceeds the configured depth limit
    #[error("spec nesting at {path} exceeds the limit of {limit} levels")]
    TooDeep {
        /// Location of the first node past the limit
        path: String,
        /// The configured maximum depth
        limit: usize,
    },
}

// =============================================================================
// LEAF ERROR
// =============================================================================

/// An error raised by a reactive leaf.
///
/// Cloning shares the underlying error, so the composite stream can hand
/// the very same error it received to its own observer.
#[derive(Debug, Clone)]
pub struct LeafError {
    inner: Rc<LeafErrorInner>,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct LeafErrorInner {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + 'static>>,
}

impl LeafError {
    /// Create an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(LeafErrorInner {
                message: message.into(),
                source: None,
            }),
        }
    }

    /// Wrap any error raised by an underlying source.
    pub fn from_error<E: StdError + 'static>(error: E) -> Self {
        Self {
            inner: Rc::new(LeafErrorInner {
                message: error.to_string(),
                source: Some(Box::new(error)),
            }),
        }
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// True when both handles refer to the same raised error.
    pub fn same_as(&self, other: &LeafError) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// Display and source come from the shared inner error.
impl fmt::Display for LeafError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl StdError for LeafError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

impl From<&str> for LeafError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for LeafError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Reset;

    #[test]
    fn malformed_messages_name_the_path() {
        let err = MalformedSpecError::Cycle {
            path: "$.a[1]".into(),
        };
        assert_eq!(err.to_string(), "spec node at $.a[1] contains itself");

        let err = MalformedSpecError::TooDeep {
            path: "$[0][0]".into(),
            limit: 1,
        };
        assert_eq!(err.to_string(), "spec nesting at $[0][0] exceeds the limit of 1 levels");
    }

    #[test]
    fn clones_share_identity() {
        let err = LeafError::new("boom");
        let copy = err.clone();
        assert!(err.same_as(&copy));
        assert!(!err.same_as(&LeafError::new("boom")));
    }

    #[test]
    fn wrapped_error_keeps_source() {
        let err = LeafError::from_error(Reset);
        assert_eq!(err.message(), "connection reset");
        assert!(err.source().is_some());
        assert!(LeafError::new("plain").source().is_none());
    }

    #[test]
    fn display_and_source_survive_cloning() {
        let err = LeafError::from_error(Reset);
        let copy = err.clone();
        assert_eq!(copy.to_string(), "connection reset");
        assert_eq!(
            copy.source().map(ToString::to_string).as_deref(),
            Some("connection reset")
        );
        assert!(format!("{copy:?}").contains("connection reset"));
    }
}
