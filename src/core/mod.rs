// ============================================================================
// spark-aggregate - Core Module
// Values, errors, flags, and the observer protocol
// ============================================================================

pub mod constants;
pub mod error;
pub mod types;
pub mod value;

// Re-export commonly used items
pub use constants::*;
pub use error::{LeafError, MalformedSpecError};
pub use types::{default_equals, EqualsFn, FnObserver, Observer, TeardownFn};
pub use value::Value;
