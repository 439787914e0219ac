// ============================================================================
// spark-aggregate - Primitives Module
// Push-based streams: observable, subject, subscriber
// ============================================================================

pub mod observable;
pub mod subject;
pub mod subscriber;

// Re-export for convenience
pub use observable::{Observable, ProducerFn};
pub use subject::Subject;
pub use subscriber::{Subscriber, Subscription};
